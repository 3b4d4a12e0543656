//! Message dispatch.
//!
//! # Data Flow
//! ```text
//! Message
//!     → App::route_message
//!         → RouteTable::match_path (first match wins)
//!         ├── Class    → factory(app, message, url_args) → Invocable::Handler
//!         ├── Function → Invocable::Function (captures bound)
//!         └── no match → base handler (not found)
//!     → Invocable::invoke → Response
//! ```
//!
//! # Design Decisions
//! - The `App` is frozen after `AppBuilder::build` and shared as `Arc<App>`
//! - Function routes get the same error containment as handler types,
//!   rendered by the base handler

pub mod app;
pub mod descriptor;

pub use app::{App, AppBuilder, AppSettings};
pub use descriptor::{Descriptor, Factory, Invocable, RouteFn};
