//! # Per-Source Listener
//!
//! One task per discovered source: consume the source's queue, decode each
//! payload, publish `MessageReceived_<source>`.

use std::sync::Arc;

use futures::StreamExt;
use shared_bus::{EventPublisher, TelemetryEvent};
use shared_types::SourceId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ReadingDecoder;
use crate::ports::{BrokerChannel, BrokerError, Delivery};
use crate::service::metrics::IngestMetrics;

/// Collaborators every listener task needs. Cheap to clone.
#[derive(Clone)]
pub struct ListenerContext {
    pub broker: Arc<dyn BrokerChannel>,
    pub decoder: Arc<dyn ReadingDecoder>,
    pub sink: Arc<dyn EventPublisher>,
    pub metrics: Arc<IngestMetrics>,
}

/// Why a listener task returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The source's stream ended (queue deleted, sensor offline).
    StreamEnded,
    /// The source's queue could not be consumed.
    ConsumeFailed(BrokerError),
    /// Shutdown was requested.
    Cancelled,
}

/// Consumer for a single source's queue.
pub struct SourceListener {
    source: SourceId,
    context: ListenerContext,
}

impl SourceListener {
    pub fn new(source: SourceId, context: ListenerContext) -> Self {
        Self { source, context }
    }

    /// Source this listener is bound to.
    #[must_use]
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Consume until the stream closes or `cancel` fires.
    ///
    /// Deliveries are handled one at a time in receipt order. A payload that
    /// fails to decode is counted and skipped.
    pub async fn run_for(self, cancel: CancellationToken) -> CloseReason {
        let mut deliveries = match self.context.broker.consume(self.source.as_str()).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Cannot consume source queue");
                return CloseReason::ConsumeFailed(e);
            }
        };
        info!("Listening for readings");

        loop {
            let delivery = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Listener cancelled");
                    return CloseReason::Cancelled;
                }
                next = deliveries.next() => match next {
                    Some(delivery) => delivery,
                    None => {
                        info!("Source stream closed");
                        return CloseReason::StreamEnded;
                    }
                },
            };
            self.handle(delivery).await;
        }
    }

    async fn handle(&self, delivery: Delivery) {
        match self.context.decoder.decode(&delivery.body) {
            Ok(reading) => {
                let event = TelemetryEvent::message_received(&self.source, reading);
                let receivers = self.context.sink.publish(event).await;
                self.context.metrics.record_reading();
                debug!(receivers, "Reading published");
            }
            Err(e) => {
                self.context.metrics.record_decode_failure();
                warn!(error = %e, bytes = delivery.body.len(), "Dropping undecodable payload");
            }
        }
    }
}
