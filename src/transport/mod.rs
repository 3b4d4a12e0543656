//! Transport implementations.
//!
//! | Transport | Source of messages |
//! |-----------|--------------------|
//! | [`BrokerTransport`] | netstring-framed broker messages over TCP |
//! | [`Gateway`] | HTTP requests accepted directly |
//! | [`MemoryTransport`] | in-process channels |

pub mod broker;
pub mod gateway;
pub mod memory;

pub use broker::BrokerTransport;
pub use gateway::Gateway;
pub use memory::{channel, MemoryClient, MemoryTransport, Reply};
