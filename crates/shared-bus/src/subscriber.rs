//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{EventFilter, TelemetryEvent};
use tokio::sync::broadcast;
use tracing::warn;

/// A subscription handle for receiving events.
///
/// Dropping it releases the underlying receiver.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<TelemetryEvent>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Events lost because this subscriber lagged.
    lagged: u64,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(receiver: broadcast::Receiver<TelemetryEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<TelemetryEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.lagged += count;
                    warn!(lagged = count, "Subscriber lagged, some events dropped");
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Take the next matching event that is already buffered.
    ///
    /// Returns `None` when nothing is buffered or the bus is gone.
    pub fn try_recv(&mut self) -> Option<TelemetryEvent> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.lagged += count;
                    continue;
                }
                Err(_) => return None,
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Total events this subscription lost to lagging.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }
}
