//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     (pattern, descriptor)
//!     → matcher.rs (compile regex, anchored at start)
//!     → router.rs (append in registration order)
//!     → frozen inside the App
//!
//! Incoming message path
//!     → router.rs (scan in order)
//!     → matcher.rs (match + capture groups)
//!     → Return: (descriptor, UrlArgs) or no match
//! ```
//!
//! # Design Decisions
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod router;

pub use matcher::{RouteError, RoutePattern, UrlArgs};
pub use router::{RouteEntry, RouteTable};
