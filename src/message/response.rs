//! The outbound response model.
//!
//! # Responsibilities
//! - Carry status, headers and body from a handler to the transport
//! - Render the HTTP/1.1 text the broker forwards to the client
//!
//! # Design Decisions
//! - `Content-Length` is computed at render time, never stored
//! - Message-flavored responses are `Framing::Raw`: the broker forwards
//!   the JSON body as is, with no HTTP envelope
//! - Multiple `Set-Cookie` values render as one header joined with
//!   `\nSet-Cookie: ` continuations

use std::borrow::Cow;
use std::fmt;

use axum::http::{header, HeaderMap, StatusCode};
use bytes::Bytes;

/// A status code and its human-readable message.
///
/// Codes are not restricted to HTTP: message-flavored handlers use small
/// negative codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub msg: Cow<'static, str>,
}

impl Status {
    pub const fn new(code: i32, msg: &'static str) -> Self {
        Self {
            code,
            msg: Cow::Borrowed(msg),
        }
    }

    pub fn with_msg(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: Cow::Owned(msg.into()),
        }
    }

    /// True when `code` is a valid HTTP status code.
    pub fn is_http(&self) -> bool {
        u16::try_from(self.code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .is_some()
    }

    /// Status to use when the response crosses an HTTP boundary.
    ///
    /// Message-flavor codes (`0`, `-1` … `-5`) map to their HTTP equivalents.
    pub fn http_status(&self) -> StatusCode {
        if let Ok(code) = u16::try_from(self.code) {
            if let Ok(status) = StatusCode::from_u16(code) {
                return status;
            }
        }
        match self.code {
            0 => StatusCode::OK,
            -1 => StatusCode::BAD_REQUEST,
            -2 => StatusCode::UNAUTHORIZED,
            -3 => StatusCode::NOT_FOUND,
            -4 => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.msg)
    }
}

/// How a transport that speaks HTTP text puts a response on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Status line, headers and body.
    #[default]
    Http,
    /// The body alone.
    Raw,
}

/// A fully rendered response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub framing: Framing,
}

impl Response {
    pub fn new(status: Status, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            framing: Framing::Http,
        }
    }

    /// Mark the response to be sent without an HTTP envelope.
    pub fn raw(mut self) -> Self {
        self.framing = Framing::Raw;
        self
    }

    /// The bytes a text transport sends: `to_http()` or the bare body.
    pub fn to_wire(&self) -> Vec<u8> {
        match self.framing {
            Framing::Http => self.to_http(),
            Framing::Raw => self.body.to_vec(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Header value as text, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every `Set-Cookie` value joined into one continuation string.
    pub fn set_cookie_line(&self) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        (!values.is_empty()).then(|| values.join("\nSet-Cookie: "))
    }

    /// Render as HTTP/1.1 response text.
    ///
    /// A code outside the HTTP range is replaced by its HTTP equivalent.
    pub fn to_http(&self) -> Vec<u8> {
        let mut lines = Vec::with_capacity(self.headers.keys_len() + 1);
        for name in self.headers.keys() {
            if name == header::CONTENT_LENGTH {
                continue;
            }
            if name == header::SET_COOKIE {
                if let Some(cookies) = self.set_cookie_line() {
                    lines.push(format!("Set-Cookie: {cookies}"));
                }
                continue;
            }
            let values: Vec<&str> = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            lines.push(format!("{}: {}", canonical_name(name.as_str()), values.join(", ")));
        }
        lines.push(format!("Content-Length: {}", self.body.len()));

        let (code, msg) = if self.status.is_http() {
            (self.status.code, self.status.msg.as_ref())
        } else {
            let status = self.status.http_status();
            (
                i32::from(status.as_u16()),
                status.canonical_reason().unwrap_or_default(),
            )
        };
        let mut out = format!(
            "HTTP/1.1 {code} {msg}\r\n{}\r\n\r\n",
            lines.join("\r\n")
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// `content-type` → `Content-Type`.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
