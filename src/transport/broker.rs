//! Broker transport: netstring-framed broker messages over two TCP streams.
//!
//! # Data Flow
//! ```text
//! broker ──pull stream──→ read_frame → Message::parse_broker → recv()
//! reply() → "SENDER LEN:CONN_ID, " + to_wire() → write_frame ──pub stream──→ broker
//! ```
//!
//! # Design Decisions
//! - The pub stream opens with one identity frame carrying the sender id
//! - A reply to a message that asked to close is followed by an empty
//!   reply, which tells the broker to drop the client
//! - Frame-level errors are fatal; a bad message inside a good frame is not

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::BrokerConfig;
use crate::message::netstring::{read_frame, write_frame};
use crate::message::{Message, ParseError, Response};
use crate::server::transport::{Transport, TransportError};

pub struct BrokerTransport {
    pull: Mutex<BufReader<TcpStream>>,
    publish: Mutex<TcpStream>,
    sender_id: String,
    max_frame_bytes: usize,
}

impl BrokerTransport {
    /// Connect both streams and announce the sender id.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, TransportError> {
        let pull = TcpStream::connect(&config.pull_address).await?;
        let mut publish = TcpStream::connect(&config.pub_address).await?;

        let sender_id = config
            .sender_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        write_frame(&mut publish, sender_id.as_bytes()).await?;

        tracing::info!(
            pull = %config.pull_address,
            publish = %config.pub_address,
            sender_id = %sender_id,
            "Connected to broker"
        );

        Ok(Self {
            pull: Mutex::new(BufReader::new(pull)),
            publish: Mutex::new(publish),
            sender_id,
            max_frame_bytes: config.max_frame_bytes,
        })
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }
}

impl Transport for BrokerTransport {
    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        let frame = {
            let mut pull = self.pull.lock().await;
            read_frame(&mut *pull, self.max_frame_bytes)
                .await
                .map_err(|e| match e {
                    ParseError::Io(io) => TransportError::Io(io),
                    other => TransportError::Frame(other),
                })?
        };
        match frame {
            Some(frame) => Ok(Some(Message::parse_broker(&frame)?)),
            None => Ok(None),
        }
    }

    async fn reply(&self, message: &Message, response: &Response) -> Result<(), TransportError> {
        let frame = reply_frame(message.sender(), message.conn_id(), &response.to_wire());

        let mut publish = self.publish.lock().await;
        write_frame(&mut *publish, &frame).await?;
        if message.should_close() {
            write_frame(&mut *publish, &reply_frame(message.sender(), message.conn_id(), b""))
                .await?;
        }
        Ok(())
    }
}

/// `SENDER LEN:CONN_ID, BODY`
pub fn reply_frame(sender: &str, conn_id: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!("{} {}:{}, ", sender, conn_id.len(), conn_id).into_bytes();
    out.extend_from_slice(body);
    out
}
