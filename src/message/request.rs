//! The inbound message model.
//!
//! # Responsibilities
//! - Normalize broker and gateway requests into one `Message` shape
//! - Expose verb, path, headers, body, arguments and cookies
//! - Decode the broker wire format (`SENDER CONN_ID PATH HEADERS BODY`)
//!
//! # Design Decisions
//! - Immutable once built; arguments and cookies are parsed lazily, once
//! - Header lookups are case-insensitive (`HeaderMap`)
//! - Every message gets a UUID used to correlate log lines

use std::collections::BTreeMap;
use std::sync::OnceLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::message::arguments::{self, Arguments, Files};
use crate::message::cookies::parse_cookie_header;
use crate::message::method::Method;
use crate::message::netstring::{parse_netstring, ParseError};

const FORM_ENCODING: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Where a message entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Netstring-framed message from the broker.
    Broker,
    /// Gateway-style request (direct HTTP).
    Gateway,
}

#[derive(Debug, Default)]
struct Form {
    arguments: Arguments,
    files: Files,
}

/// One inbound request, independent of transport.
#[derive(Debug)]
pub struct Message {
    id: Uuid,
    origin: Origin,
    sender: String,
    conn_id: String,
    path: String,
    verb: String,
    method: Option<Method>,
    headers: HeaderMap,
    body: Bytes,
    query: Option<String>,
    version: Option<String>,
    remote_addr: Option<String>,
    data: Value,
    form: OnceLock<Form>,
    cookies: OnceLock<BTreeMap<String, String>>,
}

impl Message {
    /// Start building a message for `verb path`.
    pub fn builder(verb: impl Into<String>, path: impl Into<String>) -> MessageBuilder {
        MessageBuilder::new(verb.into(), path.into())
    }

    /// Decode a raw broker message: `SENDER CONN_ID PATH <headers>,<body>,`
    /// where headers and body are netstrings and headers hold a JSON object.
    pub fn parse_broker(raw: &[u8]) -> Result<Self, ParseError> {
        let mut fields = raw.splitn(4, |b| *b == b' ');
        let sender = utf8_field(fields.next(), "sender")?;
        let conn_id = utf8_field(fields.next(), "connection id")?;
        let path = utf8_field(fields.next(), "path")?;
        let rest = fields.next().ok_or(ParseError::MissingField("headers"))?;

        let (header_block, rest) = parse_netstring(rest)?;
        let (body, _) = parse_netstring(rest)?;

        let raw_headers: serde_json::Map<String, Value> = serde_json::from_slice(header_block)?;
        let mut builder = Message::builder(
            raw_headers
                .get("METHOD")
                .and_then(Value::as_str)
                .unwrap_or_default(),
            path,
        )
        .origin(Origin::Broker)
        .sender(sender)
        .conn_id(conn_id)
        .body(Bytes::copy_from_slice(body));

        for (name, value) in &raw_headers {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match name.as_str() {
                "QUERY" => builder = builder.query(value.clone()),
                "VERSION" => builder = builder.version(value.clone()),
                "x-forwarded-for" => builder = builder.remote_addr(value.clone()),
                _ => {}
            }
            builder = builder.header(name, &value);
        }

        Ok(builder.build())
    }

    /// Correlation id assigned when the message was built.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Broker identity the reply must be addressed to.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Broker connection id of the client.
    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The verb token, uppercase.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The verb as a supported method, if it is one.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup; non-text values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Decoded body of a broker `JSON` message, `Null` otherwise.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// True for the broker's client-disconnect notification.
    pub fn is_disconnect(&self) -> bool {
        self.verb == "JSON" && self.data.get("type").and_then(Value::as_str) == Some("disconnect")
    }

    /// True when the client connection must be closed after replying.
    pub fn should_close(&self) -> bool {
        self.header("connection")
            .is_some_and(|c| c.eq_ignore_ascii_case("close"))
            || self.version.as_deref() == Some("HTTP/1.0")
    }

    /// Query and form arguments, parsed on first use.
    pub fn arguments(&self) -> &Arguments {
        &self.form().arguments
    }

    /// Uploaded multipart files, parsed on first use.
    pub fn files(&self) -> &Files {
        &self.form().files
    }

    /// Every value of argument `name`, with control characters blanked and
    /// optionally trimmed. `None` if the argument is absent.
    pub fn get_arguments(&self, name: &str, strip: bool) -> Option<Vec<String>> {
        let values = self.arguments().get(name)?;
        Some(
            values
                .iter()
                .map(|v| {
                    let cleaned = control_chars().replace_all(v, " ");
                    if strip {
                        cleaned.trim().to_string()
                    } else {
                        cleaned.into_owned()
                    }
                })
                .collect(),
        )
    }

    /// The last value of argument `name`.
    pub fn get_argument(&self, name: &str, strip: bool) -> Option<String> {
        self.get_arguments(name, strip)
            .and_then(|mut values| values.pop())
    }

    /// Request cookies, parsed on first use.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        self.cookies.get_or_init(|| {
            self.header("cookie")
                .map(parse_cookie_header)
                .unwrap_or_default()
        })
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    fn form(&self) -> &Form {
        self.form.get_or_init(|| self.parse_form())
    }

    fn parse_form(&self) -> Form {
        let mut form = Form::default();
        if let Some(query) = &self.query {
            arguments::parse_urlencoded_into(&mut form.arguments, query.as_bytes());
        }

        if !matches!(self.method, Some(Method::Post | Method::Put)) {
            return form;
        }
        let Some(content_type) = self.content_type() else {
            return form;
        };

        if content_type.starts_with(FORM_ENCODING) {
            arguments::parse_urlencoded_into(&mut form.arguments, &self.body);
        } else if content_type.starts_with(MULTIPART) {
            let (_, params) = arguments::parse_header_params(content_type);
            match params.get("boundary").filter(|b| !b.is_empty()) {
                Some(boundary) => arguments::parse_multipart_into(
                    boundary,
                    &self.body,
                    &mut form.arguments,
                    &mut form.files,
                ),
                None => tracing::warn!(request_id = %self.id, "invalid multipart/form-data"),
            }
        }
        form
    }
}

fn control_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\x00-\x08\x0e-\x1f]").expect("static pattern"))
}

fn utf8_field(field: Option<&[u8]>, name: &'static str) -> Result<String, ParseError> {
    let field = field.ok_or(ParseError::MissingField(name))?;
    std::str::from_utf8(field)
        .map(str::to_string)
        .map_err(|_| ParseError::Utf8)
}

/// Builder for [`Message`], used by transports and tests.
#[derive(Debug)]
pub struct MessageBuilder {
    origin: Origin,
    sender: String,
    conn_id: String,
    path: String,
    verb: String,
    headers: HeaderMap,
    body: Bytes,
    query: Option<String>,
    version: Option<String>,
    remote_addr: Option<String>,
}

impl MessageBuilder {
    fn new(verb: String, path: String) -> Self {
        Self {
            origin: Origin::Gateway,
            sender: String::new(),
            conn_id: String::new(),
            path,
            verb: verb.to_uppercase(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query: None,
            version: None,
            remote_addr: None,
        }
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn conn_id(mut self, conn_id: impl Into<String>) -> Self {
        self.conn_id = conn_id.into();
        self
    }

    /// Add a header. Names or values that are not valid HTTP header text
    /// are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid header"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn build(self) -> Message {
        let id = Uuid::new_v4();
        let data = if self.verb == "JSON" {
            serde_json::from_slice(&self.body).unwrap_or_else(|e| {
                tracing::warn!(request_id = %id, error = %e, "Undecodable JSON message body");
                Value::Null
            })
        } else {
            Value::Null
        };

        Message {
            id,
            origin: self.origin,
            sender: self.sender,
            conn_id: self.conn_id,
            path: self.path,
            method: Method::from_token(&self.verb),
            verb: self.verb,
            headers: self.headers,
            body: self.body,
            query: self.query,
            version: self.version,
            remote_addr: self.remote_addr,
            data,
            form: OnceLock::new(),
            cookies: OnceLock::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::netstring::encode_netstring;

    fn broker_message(headers: &str, body: &str) -> Vec<u8> {
        let mut raw = b"34f9ceee-cd52 5 /brubeck ".to_vec();
        raw.extend(encode_netstring(headers.as_bytes()));
        raw.extend(encode_netstring(body.as_bytes()));
        raw
    }

    #[test]
    fn test_parse_broker_message() {
        let raw = broker_message(
            r#"{"PATH":"/brubeck","x-forwarded-for":"127.0.0.1","METHOD":"GET","VERSION":"HTTP/1.1","QUERY":"a=1&a=2","cookie":"key=value"}"#,
            "",
        );
        let msg = Message::parse_broker(&raw).unwrap();

        assert_eq!(msg.origin(), Origin::Broker);
        assert_eq!(msg.sender(), "34f9ceee-cd52");
        assert_eq!(msg.conn_id(), "5");
        assert_eq!(msg.path(), "/brubeck");
        assert_eq!(msg.method(), Some(Method::Get));
        assert_eq!(msg.remote_addr(), Some("127.0.0.1"));
        assert_eq!(msg.header("Method"), Some("GET"));
        assert_eq!(msg.get_argument("a", true).as_deref(), Some("2"));
        assert_eq!(msg.cookie("key"), Some("value"));
        assert!(!msg.should_close());
    }

    #[test]
    fn test_parse_broker_message_errors() {
        assert!(matches!(
            Message::parse_broker(b"sender 1"),
            Err(ParseError::MissingField(_))
        ));
        assert!(matches!(
            Message::parse_broker(b"sender 1 / 4:nope,0:,"),
            Err(ParseError::Headers(_))
        ));
    }

    #[test]
    fn test_disconnect_message() {
        let raw = broker_message(r#"{"METHOD":"JSON"}"#, r#"{"type":"disconnect"}"#);
        let msg = Message::parse_broker(&raw).unwrap();
        assert!(msg.is_disconnect());
        assert_eq!(msg.method(), None);
    }

    #[test]
    fn test_form_body_arguments() {
        let msg = Message::builder("post", "/form")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .query("q=search")
            .body("name=%20Ada%01&empty=")
            .build();

        assert_eq!(msg.verb(), "POST");
        assert_eq!(msg.get_argument("q", true).as_deref(), Some("search"));
        assert_eq!(msg.get_argument("name", true).as_deref(), Some("Ada"));
        assert_eq!(msg.get_argument("name", false).as_deref(), Some(" Ada "));
        assert_eq!(msg.get_argument("empty", true), None);
    }

    #[test]
    fn test_form_body_ignored_for_get() {
        let msg = Message::builder("GET", "/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("name=Ada")
            .build();
        assert!(msg.arguments().is_empty());
    }

    #[test]
    fn test_should_close() {
        let msg = Message::builder("GET", "/").version("HTTP/1.0").build();
        assert!(msg.should_close());

        let msg = Message::builder("GET", "/").header("Connection", "close").build();
        assert!(msg.should_close());
    }
}
