//! Message routing and handler lifecycle engine.
//!
//! Requests arrive from a broker or an HTTP gateway, are routed by regex to
//! a handler type or function, run through a fixed lifecycle and are
//! answered on the transport they came from.
//!
//! # Architecture Overview
//!
//! ```text
//!   broker (TCP) ──┐                              ┌──────────────┐
//!   gateway (HTTP) ├─→ transport ─→ server loop ─→│  dispatch    │
//!   memory ────────┘       ▲          │           │  (App)       │
//!                          │          ▼           └──────┬───────┘
//!                          │      executor               ▼
//!                          │     (TaskPool)       routing (first match)
//!                          │                             ▼
//!                          └──── Response ◀──── handler lifecycle
//!                                               (prepare → verb → finish)
//!                                                    │        │
//!                                               security    crud
//! ```

pub mod config;
pub mod crud;
pub mod dispatch;
pub mod handler;
pub mod message;
pub mod observability;
pub mod routing;
pub mod security;
pub mod server;
pub mod transport;

pub use config::AppConfig;
pub use dispatch::{App, AppBuilder, AppSettings, Descriptor};
pub use handler::{Context, Flavor, Handler, HandlerError, HandlerResult, MethodTable};
pub use message::{Message, Method, Response, Status};
pub use server::{Server, Shutdown, TaskPool};
