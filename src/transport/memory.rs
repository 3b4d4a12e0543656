//! In-process transport backed by channels.
//!
//! Used by tests and embedders that feed messages directly.

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::message::{Message, Response};
use crate::server::transport::{Transport, TransportError};

/// A response delivered through a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct Reply {
    pub message_id: Uuid,
    pub conn_id: String,
    pub response: Response,
}

/// Server side of the channel pair.
#[derive(Debug)]
pub struct MemoryTransport {
    inbox: Mutex<mpsc::Receiver<Message>>,
    outbox: mpsc::UnboundedSender<Reply>,
}

/// Client side: sends messages in, receives replies out.
#[derive(Debug)]
pub struct MemoryClient {
    tx: Option<mpsc::Sender<Message>>,
    replies: mpsc::UnboundedReceiver<Reply>,
}

/// Create a connected transport and client. `capacity` bounds the inbox.
pub fn channel(capacity: usize) -> (MemoryTransport, MemoryClient) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            inbox: Mutex::new(rx),
            outbox: reply_tx,
        },
        MemoryClient {
            tx: Some(tx),
            replies: reply_rx,
        },
    )
}

impl Transport for MemoryTransport {
    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        Ok(self.inbox.lock().await.recv().await)
    }

    async fn reply(&self, message: &Message, response: &Response) -> Result<(), TransportError> {
        self.outbox
            .send(Reply {
                message_id: message.id(),
                conn_id: message.conn_id().to_string(),
                response: response.clone(),
            })
            .map_err(|_| TransportError::Closed)
    }
}

impl MemoryClient {
    /// Queue a message. Returns its id, or `Closed` once the server is gone.
    pub async fn send(&self, message: Message) -> Result<Uuid, TransportError> {
        let id = message.id();
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message).await.map_err(|_| TransportError::Closed)?;
        Ok(id)
    }

    /// Next reply, or `None` when the server side has been dropped.
    pub async fn recv(&mut self) -> Option<Reply> {
        self.replies.recv().await
    }

    /// Stop sending. The server loop sees the transport close once the
    /// inbox drains.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
