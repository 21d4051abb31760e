//! Shared fixtures: a coordinator running on the in-memory broker and bus.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use sensor_discovery::testing::wait_until;
use sensor_discovery::{
    encode_reading, BrokerChannel, DiscoveryConfig, DiscoveryError, DiscoveryListener,
    InMemoryBroker, WireCodec, AMQ_FANOUT,
};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription, TelemetryEvent};
use shared_types::SensorReading;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// A discovery listener running in the background.
pub struct Coordinator {
    pub broker: Arc<InMemoryBroker>,
    pub bus: Arc<InMemoryEventBus>,
    pub cancel: CancellationToken,
    /// Every bus event, subscribed before the listener starts.
    pub events: Subscription,
    task: JoinHandle<(Result<(), DiscoveryError>, DiscoveryListener)>,
}

impl Coordinator {
    /// Start a coordinator and wait until it has subscribed and broadcast.
    pub async fn start(broker: Arc<InMemoryBroker>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let cancel = CancellationToken::new();
        let events = bus.subscribe(EventFilter::all());
        let mut listener = DiscoveryListener::new(
            DiscoveryConfig {
                shutdown_grace: Duration::from_millis(500),
                ..DiscoveryConfig::default()
            },
            broker.clone(),
            Arc::new(WireCodec::default()),
            bus.clone(),
            cancel.clone(),
        );
        let task = tokio::spawn(async move {
            let result = listener.run().await;
            (result, listener)
        });
        wait_until(|| broker.has_exchange("SensorDiscovery")).await;

        Self {
            broker,
            bus,
            cancel,
            events,
            task,
        }
    }

    /// Cancel and return the finished listener.
    pub async fn stop(self) -> DiscoveryListener {
        self.cancel.cancel();
        let (result, listener) = timeout(EVENT_TIMEOUT, self.task)
            .await
            .expect("listener did not stop")
            .expect("listener task panicked");
        result.expect("listener failed");
        listener
    }
}

/// Declare the sensor's data queue and announce it.
pub async fn announce(broker: &InMemoryBroker, name: &str) {
    broker.declare_queue(name).await.unwrap();
    broker
        .publish(AMQ_FANOUT, "", name.as_bytes().to_vec())
        .await
        .unwrap();
}

pub fn reading(name: &str, value: f64) -> SensorReading {
    SensorReading::new(name, Utc.timestamp_opt(1_700_000_000, 0).unwrap(), value)
}

/// Publish an encoded reading to a sensor's queue.
pub async fn send_reading(broker: &InMemoryBroker, queue: &str, reading: &SensorReading) {
    send_raw(broker, queue, encode_reading(reading).unwrap()).await;
}

pub async fn send_raw(broker: &InMemoryBroker, queue: &str, body: Vec<u8>) {
    broker.publish("", queue, body).await.unwrap();
}

/// Next event on the subscription, failing the test after a timeout.
pub async fn next_event(subscription: &mut Subscription) -> TelemetryEvent {
    timeout(EVENT_TIMEOUT, subscription.recv())
        .await
        .expect("timed out waiting for event")
        .expect("bus closed")
}

/// Assert nothing arrives within a short window.
pub async fn assert_quiet(subscription: &mut Subscription) {
    if let Ok(Some(event)) = timeout(Duration::from_millis(100), subscription.recv()).await {
        panic!("unexpected event {}", event.name());
    }
}
