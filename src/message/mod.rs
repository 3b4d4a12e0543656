//! Message model subsystem.
//!
//! # Data Flow
//! ```text
//! broker frame (netstring) ──→ netstring.rs ──→ Message::parse_broker ─┐
//! gateway request ──────────────────────────→ Message::builder ───────┤
//!                                                                     ▼
//!                                                     Message (request.rs)
//!                                                       ├─ arguments.rs (lazy)
//!                                                       └─ cookies.rs   (lazy)
//!
//! handler output ──→ Response (response.rs) ──→ transport
//! ```

pub mod arguments;
pub mod cookies;
pub mod method;
pub mod netstring;
pub mod request;
pub mod response;

pub use arguments::{Arguments, FilePart, Files};
pub use cookies::{Cookie, CookieJar};
pub use method::Method;
pub use netstring::ParseError;
pub use request::{Message, MessageBuilder, Origin};
pub use response::{Framing, Response, Status};
