//! The response-building state a handler accumulates.

use axum::http::HeaderMap;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::message::Status;

/// Typed payload: status, timestamp, body, headers and free-form JSON data.
///
/// Web handlers fill `body` and `headers`; JSON and message handlers put
/// their output fields in `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub status: Status,
    /// Milliseconds since the Unix epoch at handler creation.
    pub timestamp: i64,
    pub body: Bytes,
    pub headers: HeaderMap,
    pub data: Map<String, Value>,
}

impl Payload {
    pub fn new(status: Status, timestamp: i64) -> Self {
        Self {
            status,
            timestamp,
            body: Bytes::new(),
            headers: HeaderMap::new(),
            data: Map::new(),
        }
    }

    /// Reset body, headers and data. Status and timestamp are preserved.
    pub fn clear(&mut self) {
        self.body = Bytes::new();
        self.headers.clear();
        self.data.clear();
    }

    /// The JSON document rendered by JSON and message handlers.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("status_code".into(), self.status.code.into());
        doc.insert("status_msg".into(), Value::String(self.status.msg.to_string()));
        doc.insert("timestamp".into(), self.timestamp.into());
        for (key, value) in &self.data {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_preserves_status() {
        let mut payload = Payload::new(Status::new(404, "Not found"), 1);
        payload.body = Bytes::from_static(b"gone");
        payload.data.insert("k".into(), Value::Bool(true));

        payload.clear();
        assert_eq!(payload.status.code, 404);
        assert!(payload.body.is_empty());
        assert!(payload.data.is_empty());
    }

    #[test]
    fn test_to_json() {
        let mut payload = Payload::new(Status::new(0, "OK"), 42);
        payload.data.insert("data".into(), serde_json::json!([1, 2]));
        assert_eq!(
            payload.to_json(),
            serde_json::json!({"status_code": 0, "status_msg": "OK", "timestamp": 42, "data": [1, 2]})
        );
    }
}
