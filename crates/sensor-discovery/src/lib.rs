//! # Sensor Discovery & Ingestion
//!
//! Finds sensors announced over a publish/subscribe broker, opens one
//! consumption stream per sensor, decodes each binary reading and republishes
//! it on the internal event bus.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** source registry and the sensor wire codec
//! - **Ports Layer:** the broker substrate the core consumes
//! - **Service Layer:** broadcaster, discovery loop, per-source listeners and
//!   their supervisor
//! - **Adapters Layer:** an in-memory broker
//!
//! ## Flow
//!
//! ```text
//! Broadcaster ──request──→ SensorDiscovery (fanout)
//!                                 │  sensors answer
//!                                 ▼
//!                          amq.fanout (announcements)
//!                                 │
//!                                 ▼
//!                       DiscoveryListener ── SourceRegistry (sole writer)
//!                                 │ spawn once per source
//!                                 ▼
//!                   SourceListener(id) ── consume queue `id`
//!                                 │ decode
//!                                 ▼
//!                     EventPublisher: MessageReceived_<id>
//! ```
//!
//! ## Ownership
//!
//! The registry lives inside the `DiscoveryListener` and is only touched from
//! its single consumption loop. Listener tasks never see it; when a task's
//! stream closes it reports back over a channel and the loop deregisters the
//! source, so the same identifier can be discovered again later.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sensor_discovery::{DiscoveryConfig, DiscoveryListener, InMemoryBroker, WireCodec};
//! use shared_bus::InMemoryEventBus;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let broker = Arc::new(InMemoryBroker::new());
//! let bus = Arc::new(InMemoryEventBus::new());
//! let cancel = CancellationToken::new();
//!
//! let mut listener = DiscoveryListener::new(
//!     DiscoveryConfig::default(),
//!     broker,
//!     Arc::new(WireCodec::default()),
//!     bus,
//!     cancel.clone(),
//! );
//! listener.run().await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (recording sink, failing broker, polling helper).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Domain
pub use domain::{
    decode_reading, encode_reading, DecodeError, EncodeError, ReadingDecoder, SourceRegistry,
    WireCodec, DEFAULT_MAX_PAYLOAD_BYTES,
};

// Ports
pub use ports::{BrokerChannel, BrokerError, Delivery, DeliveryStream};

// Service
pub use service::{
    AnnouncementOutcome, CloseReason, DiscoveryBroadcaster, DiscoveryConfig, DiscoveryError,
    DiscoveryListener, IngestMetrics, ListenerContext, ListenerSupervisor, MetricsSnapshot,
    Reaped, SourceClosed, SourceListener, DEFAULT_DISCOVERY_EXCHANGE, DEFAULT_SHUTDOWN_GRACE,
};

// Adapters
pub use adapters::{InMemoryBroker, AMQ_FANOUT, DEFAULT_EXCHANGE};

// Shared entities, re-exported for convenience
pub use shared_types::{SensorReading, SourceId, SourceIdError};
