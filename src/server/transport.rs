//! The boundary between the server loop and the outside world.

use std::future::Future;

use crate::message::{Message, ParseError, Response};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream lost framing; nothing further can be read from it.
    #[error("broken frame stream: {0}")]
    Frame(ParseError),

    /// One message could not be decoded; the stream is still usable.
    #[error("malformed message: {0}")]
    Parse(#[from] ParseError),

    #[error("no pending request for message {0}")]
    UnknownRequest(uuid::Uuid),

    #[error("transport closed")]
    Closed,
}

/// Source of messages and sink for their responses.
///
/// `recv` is called from one loop; `reply` from many tasks at once, in any
/// order.
pub trait Transport: Send + Sync + 'static {
    /// Next message, or `None` once the transport is exhausted.
    fn recv(&self) -> impl Future<Output = Result<Option<Message>, TransportError>> + Send;

    /// Deliver `response` to whoever sent `message`.
    fn reply(&self, message: &Message, response: &Response) -> impl Future<Output = Result<(), TransportError>> + Send;
}
