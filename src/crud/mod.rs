//! CRUD surface: a storage contract and the JSON handler that exposes it.
//!
//! # Data Flow
//! ```text
//! AppBuilder::register_api(name, queryset)
//!     → route `{api_base_url}{name}/(ids)` → Resource<Q>
//!
//! Request → Resource (verb → CRUD op) → Queryset → (CrudStatus, item)*
//!     → status aggregation → JSON response
//! ```

pub mod memory;
pub mod queryset;
pub mod resource;

pub use memory::MemoryQueryset;
pub use queryset::{item_id, CrudError, CrudOutcome, CrudStatus, OneOrMany, Queryset};
pub use resource::{aggregate_status, resource_pattern, Resource, ID_SEPARATOR};
