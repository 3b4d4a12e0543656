//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Handler method / prepare():
//!     → auth.rs (authenticated / web_authenticated guard)
//!     → Context::current_user → Authenticator (once per request)
//!     → signing.rs (verify signed cookie)
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unverifiable cookie is treated as absent
//! - Signature comparison is constant time

pub mod auth;
pub mod signing;

pub use auth::{authenticated, web_authenticated, Authenticator, CookieAuthenticator};
pub use signing::SigningError;
