//! # Coordinator Runtime
//!
//! Wires the discovery core to the broker and the event bus.
//!
//! ## Startup Sequence
//!
//! 1. Start the event logger (the downstream bus consumer)
//! 2. Start the simulated sensors (each announces itself)
//! 3. Run the discovery listener until the root token is cancelled
//! 4. Stop sensors and the logger, report the ingest counters

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use sensor_discovery::{
    BrokerChannel, DiscoveryListener, InMemoryBroker, MetricsSnapshot, WireCodec,
};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription, TelemetryEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::simulator::SimulatedSensor;

/// What a finished run observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ingest counters at shutdown.
    pub metrics: MetricsSnapshot,
    /// Events the logger saw on the bus.
    pub events_logged: u64,
}

/// The coordinator process: broker, bus, discovery core and sensors.
pub struct CoordinatorRuntime {
    config: CoordinatorConfig,
    broker: Arc<InMemoryBroker>,
    bus: Arc<InMemoryEventBus>,
    cancel: CancellationToken,
}

impl CoordinatorRuntime {
    pub fn new(config: CoordinatorConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        Self {
            config,
            broker: Arc::new(InMemoryBroker::new()),
            bus,
            cancel: CancellationToken::new(),
        }
    }

    /// Root token; cancelling it shuts the runtime down.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn broker(&self) -> Arc<InMemoryBroker> {
        self.broker.clone()
    }

    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    /// Run until the root token is cancelled or discovery fails.
    pub async fn run(self) -> Result<RunSummary> {
        info!("===========================================");
        info!("  Sensor Coordinator v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let logger = spawn_event_logger(self.bus.subscribe(EventFilter::all()), self.cancel.clone());
        let sensors = self.start_sensors().await;

        let mut discovery = DiscoveryListener::new(
            self.config.discovery.clone(),
            self.broker.clone(),
            Arc::new(WireCodec::new(self.config.max_payload_bytes)),
            self.bus.clone(),
            self.cancel.clone(),
        );
        let result = discovery.run().await;

        // Discovery may have stopped on its own; everything else follows it.
        self.cancel.cancel();
        let stopped = join_all(sensors).await;
        debug!(sensors = stopped.len(), "Sensors stopped");
        let events_logged = logger.await.unwrap_or_else(|e| {
            warn!(error = %e, "Event logger task failed");
            0
        });

        let metrics = discovery.metrics().snapshot();
        info!(
            sources_discovered = metrics.sources_discovered,
            readings_published = metrics.readings_published,
            decode_failures = metrics.decode_failures,
            events_logged,
            "Coordinator stopped"
        );

        result.context("Discovery listener failed")?;
        Ok(RunSummary {
            metrics,
            events_logged,
        })
    }

    /// Start the configured sensors. One that fails to start is logged and
    /// skipped.
    async fn start_sensors(&self) -> Vec<JoinHandle<()>> {
        let broker: Arc<dyn BrokerChannel> = self.broker.clone();
        let mut handles = Vec::with_capacity(self.config.sensors.names.len());
        for id in &self.config.sensors.names {
            let sensor = SimulatedSensor::new(
                id.clone(),
                broker.clone(),
                self.config.discovery.discovery_exchange.as_str(),
                self.config.discovery.announce_exchange.as_str(),
                self.config.sensors.interval,
            );
            match sensor.start(self.cancel.clone()).await {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(sensor = %id, error = %e, "Simulated sensor failed to start"),
            }
        }
        if !handles.is_empty() {
            info!(count = handles.len(), "Simulated sensors started");
        }
        handles
    }
}

/// Log every bus event at debug level until cancelled. Returns the count.
///
/// Events already buffered when the token fires are still logged.
pub fn spawn_event_logger(
    mut subscription: Subscription,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    while let Some(event) = subscription.try_recv() {
                        seen += 1;
                        log_event(&event);
                    }
                    break;
                }
                event = subscription.recv() => match event {
                    Some(event) => {
                        seen += 1;
                        log_event(&event);
                    }
                    None => break,
                },
            }
        }
        if subscription.lagged() > 0 {
            warn!(dropped = subscription.lagged(), "Event logger fell behind");
        }
        seen
    })
}

fn log_event(event: &TelemetryEvent) {
    match event.reading() {
        Some(reading) => debug!(
            event = %event.name(),
            name = %reading.name(),
            value = reading.value(),
            timestamp = %reading.timestamp(),
            "Event"
        ),
        None => debug!(event = %event.name(), source = ?event.source(), "Event"),
    }
}
