//! Server loop and its collaborators.
//!
//! # Data Flow
//! ```text
//! Transport::recv ──→ Message
//!     ├── disconnect → ignored
//!     └── Executor::submit(task)
//!             task: App::route_message → Invocable::invoke → Response
//!                   → Transport::reply
//! ```
//!
//! # Design Decisions
//! - One task per message; responses may complete out of order
//! - The loop never waits for a handler, only for executor capacity
//! - Shutdown stops receiving; in-flight tasks are not drained

pub mod executor;
pub mod runner;
pub mod shutdown;
pub mod signals;
pub mod transport;

pub use executor::{Executor, TaskPool};
pub use runner::{process, Server, ServerError};
pub use shutdown::Shutdown;
pub use signals::shutdown_on_ctrl_c;
pub use transport::{Transport, TransportError};
