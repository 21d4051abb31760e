//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventFilter, TelemetryEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// The event sink.
///
/// The only capability the ingestion core needs from the bus. Fan-out to
/// subscribers, buffering and backpressure are the implementation's concern.
/// Implementations must tolerate concurrent calls from every listener task.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: TelemetryEvent) -> usize;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, event: TelemetryEvent) -> usize {
        (**self).publish(event).await
    }
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Publishing never waits; a subscriber that falls behind loses the oldest
/// events.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<TelemetryEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(topics = ?filter.topics, sources = filter.sources.len(), "New subscription created");
        Subscription::new(receiver, filter)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the total number of events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: TelemetryEvent) -> usize {
        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let name = event.name().to_owned();
        match self.sender.send(event) {
            Ok(receiver_count) => {
                trace!(event = %name, receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(_) => {
                // No receivers - event is dropped
                trace!(event = %name, "Event dropped (no receivers)");
                0
            }
        }
    }
}
