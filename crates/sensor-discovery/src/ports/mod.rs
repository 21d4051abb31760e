//! Ports Layer
//!
//! Defines the interfaces (traits) this crate depends on. The event sink port
//! lives in `shared-bus` as [`shared_bus::EventPublisher`].

pub mod outbound;

pub use outbound::{BrokerChannel, BrokerError, Delivery, DeliveryStream};
