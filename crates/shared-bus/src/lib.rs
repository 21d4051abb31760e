//! # Shared Bus - Internal Event Bus
//!
//! Carries named telemetry events from the ingestion core to downstream
//! consumers.
//!
//! ## Choreography
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ Discovery loop / │                    │ Downstream       │
//! │ source listeners │    publish()       │ consumer         │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │          │
//!                      │              │ ─────────┘
//!                      └──────────────┘  subscribe()
//! ```
//!
//! ## Rules
//!
//! - Producers only see the [`EventPublisher`] trait; fan-out stays here.
//! - Consumers discriminate on the event name, never on payload shape.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{
    EventFilter, EventPayload, EventTopic, TelemetryEvent, DATA_SOURCE_DISCOVERED,
    MESSAGE_RECEIVED_PREFIX,
};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::Subscription;

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
