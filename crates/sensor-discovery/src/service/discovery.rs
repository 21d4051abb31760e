//! # Discovery Listener
//!
//! The single consumption loop over sensor announcements and the only writer
//! of the [`SourceRegistry`].
//!
//! ## Loop
//!
//! ```text
//! subscribe (anonymous queue → announce exchange)
//!     → broadcast discovery request
//!     → select! {
//!           cancel             => stop
//!           listener closed    => deregister, or restart if re-announced
//!           announcement       => validate → dedup → emit → spawn
//!       }
//!     → supervisor.shutdown(grace)
//! ```
//!
//! Each announcement is handled to completion, registry mutation included,
//! before the next one is pulled from the stream.

use std::sync::Arc;

use futures::StreamExt;
use shared_bus::{EventPublisher, TelemetryEvent};
use shared_types::{SourceId, SourceIdError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ReadingDecoder, SourceRegistry};
use crate::ports::{BrokerChannel, Delivery, DeliveryStream};
use crate::service::broadcaster::DiscoveryBroadcaster;
use crate::service::config::DiscoveryConfig;
use crate::service::errors::DiscoveryError;
use crate::service::listener::{ListenerContext, SourceListener};
use crate::service::metrics::IngestMetrics;
use crate::service::supervisor::{ListenerSupervisor, Reaped, SourceClosed};

/// What happened to one announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    /// New source: registered, announced on the bus, listener spawned.
    Registered(SourceId),
    /// Source already has a running listener.
    Duplicate(SourceId),
    /// Body is not a usable identifier.
    Invalid(SourceIdError),
}

/// Consumes announcements and manages per-source listeners.
pub struct DiscoveryListener {
    config: DiscoveryConfig,
    broker: Arc<dyn BrokerChannel>,
    context: ListenerContext,
    broadcaster: DiscoveryBroadcaster,
    registry: SourceRegistry,
    supervisor: ListenerSupervisor,
    closed_rx: mpsc::UnboundedReceiver<SourceClosed>,
    cancel: CancellationToken,
}

impl DiscoveryListener {
    /// Build a listener. Nothing touches the broker until [`run`](Self::run).
    pub fn new(
        config: DiscoveryConfig,
        broker: Arc<dyn BrokerChannel>,
        decoder: Arc<dyn ReadingDecoder>,
        sink: Arc<dyn EventPublisher>,
        cancel: CancellationToken,
    ) -> Self {
        let broadcaster = DiscoveryBroadcaster::new(broker.clone(), config.discovery_exchange.clone());
        let (supervisor, closed_rx) = ListenerSupervisor::new(cancel.clone());
        let context = ListenerContext {
            broker: broker.clone(),
            decoder,
            sink,
            metrics: Arc::new(IngestMetrics::new()),
        };
        Self {
            config,
            broker,
            context,
            broadcaster,
            registry: SourceRegistry::new(),
            supervisor,
            closed_rx,
            cancel,
        }
    }

    /// Counters shared with every listener task.
    #[must_use]
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        self.context.metrics.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Number of listener tasks being tracked.
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.supervisor.active()
    }

    /// Subscribe, broadcast once, then consume announcements until cancelled.
    ///
    /// Returns an error if setup fails or the broker ends the announcement
    /// stream. Listener tasks are shut down before returning either way.
    pub async fn run(&mut self) -> Result<(), DiscoveryError> {
        let result = self.run_inner().await;
        self.supervisor.shutdown(self.config.shutdown_grace).await;
        info!(sources = self.registry.len(), "Discovery listener stopped");
        result
    }

    async fn run_inner(&mut self) -> Result<(), DiscoveryError> {
        let mut announcements = self.subscribe().await?;
        self.broadcaster.broadcast().await?;
        info!(
            discovery_exchange = %self.config.discovery_exchange,
            announce_exchange = %self.config.announce_exchange,
            "Discovery listener started"
        );

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(()),
                Some(closed) = self.closed_rx.recv() => self.handle_closed(closed).await,
                next = announcements.next() => match next {
                    Some(delivery) => {
                        self.handle_announcement(&delivery).await;
                    }
                    None => {
                        warn!("Announcement stream closed by broker");
                        return Err(DiscoveryError::AnnouncementsClosed);
                    }
                },
            }
        }
    }

    /// Anonymous auto-delete queue bound to the announce exchange.
    async fn subscribe(&self) -> Result<DeliveryStream, DiscoveryError> {
        let queue = self.broker.declare_queue("").await?;
        self.broker
            .bind_queue(&queue, &self.config.announce_exchange, "")
            .await?;
        let stream = self.broker.consume(&queue).await?;
        debug!(queue = %queue, "Subscribed to announcements");
        Ok(stream)
    }

    /// Process one announcement.
    ///
    /// `DataSourceDiscovered` is published before the listener is spawned, so
    /// a subscriber always sees it ahead of the source's first reading.
    pub async fn handle_announcement(&mut self, delivery: &Delivery) -> AnnouncementOutcome {
        let metrics = &self.context.metrics;
        metrics.record_announcement();

        let source = match SourceId::from_bytes(&delivery.body) {
            Ok(source) => source,
            Err(e) => {
                metrics.record_invalid_announcement();
                warn!(error = %e, bytes = delivery.body.len(), "Ignoring invalid announcement");
                return AnnouncementOutcome::Invalid(e);
            }
        };

        if !self.registry.try_register(source.clone()) {
            if self.supervisor.is_running(&source) {
                // Restart on closure if the running task is draining a dead queue.
                self.supervisor.mark_reannounced(&source);
                metrics.record_duplicate();
                debug!(source = %source, "Duplicate announcement");
                return AnnouncementOutcome::Duplicate(source);
            }
            // Task finished but its notice has not been handled yet.
            self.supervisor.forget(&source);
            metrics.record_closed();
            debug!(source = %source, "Reaped finished listener");
        }

        self.start_source(source.clone()).await;
        AnnouncementOutcome::Registered(source)
    }

    /// Deregister a source whose listener stopped, unless the notice is stale.
    ///
    /// A source that announced itself while its listener was still running is
    /// kept registered and gets a fresh listener.
    pub async fn handle_closed(&mut self, closed: SourceClosed) {
        let reaped = self.supervisor.reap(&closed);
        if reaped == Reaped::Stale {
            debug!(source = %closed.source, generation = closed.generation, "Stale closure notice");
            return;
        }
        self.context.metrics.record_closed();
        info!(source = %closed.source, reason = ?closed.reason, "Data source closed");

        if reaped == Reaped::Reannounced {
            self.start_source(closed.source).await;
        } else {
            self.registry.deregister(&closed.source);
        }
    }

    /// Emit `DataSourceDiscovered` for a registered source, then spawn its listener.
    async fn start_source(&mut self, source: SourceId) {
        self.context.metrics.record_discovered();
        info!(source = %source, "Data source discovered");

        self.context
            .sink
            .publish(TelemetryEvent::source_discovered(source.clone()))
            .await;
        self.supervisor
            .spawn(SourceListener::new(source, self.context.clone()));
    }
}
