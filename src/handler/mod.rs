//! Request handlers and their lifecycle.
//!
//! # Responsibilities
//! - Define the [`Handler`] trait and its overridable hooks
//! - Map verbs to handler methods ([`MethodTable`])
//! - Run one handler instance per request and always produce a response
//! - Render payloads per [`Flavor`]
//!
//! # Data Flow
//! ```text
//! Dispatcher → factory(Context) → Instance<H>
//!     → lifecycle.rs (prepare → dispatch → invoke → finish)
//!     → context.rs   (payload → Response)
//! ```

pub mod base;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod methods;
pub mod payload;
pub mod status;
pub mod template;

pub use base::DefaultHandler;
pub use context::{Context, RenderOptions};
pub use error::HandlerError;
pub use lifecycle::{run, Handler, Instance, Lifecycle};
pub use methods::{HandlerFuture, HandlerResult, MethodFn, MethodTable};
pub use payload::Payload;
pub use status::{Flavor, StatusKind};
pub use template::{DirectoryTemplates, TemplateError, TemplateRenderer};
