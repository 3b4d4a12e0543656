//! Per-message spans.
//!
//! Every event emitted while a message is handled carries its request id,
//! verb and path through the span created here.

use tracing::Span;

use crate::message::Message;

pub fn message_span(message: &Message) -> Span {
    tracing::info_span!(
        "message",
        request_id = %message.id(),
        method = %message.verb(),
        path = %message.path(),
        origin = ?message.origin(),
    )
}
