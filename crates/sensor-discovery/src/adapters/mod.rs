//! Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod memory_broker;

pub use memory_broker::{InMemoryBroker, AMQ_FANOUT, DEFAULT_EXCHANGE};
