//! Simulated sensors.
//!
//! Each sensor behaves like a real one on the broker: it owns a queue named
//! after itself, announces that name on the announce exchange when it starts
//! and again on every discovery request, and publishes a reading to its
//! queue once per interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_discovery::{encode_reading, BrokerChannel, BrokerError, DeliveryStream, DEFAULT_EXCHANGE};
use shared_types::{SensorReading, SourceId};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// One simulated sensor.
pub struct SimulatedSensor {
    id: SourceId,
    broker: Arc<dyn BrokerChannel>,
    discovery_exchange: String,
    announce_exchange: String,
    interval: Duration,
    value: f64,
}

impl SimulatedSensor {
    pub fn new(
        id: SourceId,
        broker: Arc<dyn BrokerChannel>,
        discovery_exchange: impl Into<String>,
        announce_exchange: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            id,
            broker,
            discovery_exchange: discovery_exchange.into(),
            announce_exchange: announce_exchange.into(),
            interval,
            value: 20.0,
        }
    }

    /// Starting value of the random walk.
    #[must_use]
    pub fn with_initial_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn id(&self) -> &SourceId {
        &self.id
    }

    /// Declare the data queue, subscribe to discovery requests, announce once
    /// and spawn the publishing loop.
    ///
    /// Broker setup happens before this returns, so a discovery request
    /// broadcast afterwards is guaranteed to reach the sensor.
    pub async fn start(
        self,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, BrokerError> {
        self.broker.declare_queue(self.id.as_str()).await?;
        self.broker
            .declare_fanout_exchange(&self.discovery_exchange)
            .await?;
        let requests_queue = self.broker.declare_queue("").await?;
        self.broker
            .bind_queue(&requests_queue, &self.discovery_exchange, "")
            .await?;
        let requests = self.broker.consume(&requests_queue).await?;
        self.announce().await?;

        let span = info_span!("sensor", sensor = %self.id);
        Ok(tokio::spawn(self.run(requests, cancel).instrument(span)))
    }

    async fn announce(&self) -> Result<(), BrokerError> {
        self.broker
            .publish(
                &self.announce_exchange,
                "",
                self.id.as_str().as_bytes().to_vec(),
            )
            .await?;
        debug!("Announced");
        Ok(())
    }

    async fn run(mut self, mut requests: DeliveryStream, cancel: CancellationToken) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "Sensor started");

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                request = requests.next() => match request {
                    Some(_) => self.announce().await,
                    None => {
                        warn!("Discovery request stream closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.value += rng.gen_range(-0.5..=0.5);
                    self.publish_reading().await
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Sensor stopping");
                break;
            }
        }

        info!("Sensor stopped");
    }

    async fn publish_reading(&self) -> Result<(), BrokerError> {
        let reading = SensorReading::new(self.id.as_str(), Utc::now(), self.value);
        let body = encode_reading(&reading).map_err(|e| BrokerError::Operation(e.to_string()))?;
        self.broker
            .publish(DEFAULT_EXCHANGE, self.id.as_str(), body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_discovery::{decode_reading, InMemoryBroker, AMQ_FANOUT};
    use tokio::time::timeout;

    fn sensor(broker: &Arc<InMemoryBroker>, name: &str) -> SimulatedSensor {
        SimulatedSensor::new(
            SourceId::new(name).unwrap(),
            broker.clone(),
            "SensorDiscovery",
            AMQ_FANOUT,
            Duration::from_millis(10),
        )
    }

    async fn announcements(broker: &InMemoryBroker) -> DeliveryStream {
        let q = broker.declare_queue("").await.unwrap();
        broker.bind_queue(&q, AMQ_FANOUT, "").await.unwrap();
        broker.consume(&q).await.unwrap()
    }

    #[tokio::test]
    async fn test_sensor_announces_on_start_and_on_request() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut announced = announcements(&broker).await;
        let cancel = CancellationToken::new();

        let task = sensor(&broker, "temp1").start(cancel.clone()).await.unwrap();
        let first = timeout(Duration::from_secs(1), announced.next()).await.unwrap().unwrap();
        assert_eq!(first.body, b"temp1");

        broker.publish("SensorDiscovery", "", Vec::new()).await.unwrap();
        let second = timeout(Duration::from_secs(1), announced.next()).await.unwrap().unwrap();
        assert_eq!(second.body, b"temp1");

        cancel.cancel();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sensor_publishes_decodable_readings() {
        let broker = Arc::new(InMemoryBroker::new());
        let cancel = CancellationToken::new();

        let task = sensor(&broker, "temp1")
            .with_initial_value(21.5)
            .start(cancel.clone())
            .await
            .unwrap();
        let mut readings = broker.consume("temp1").await.unwrap();

        for _ in 0..3 {
            let delivery = timeout(Duration::from_secs(1), readings.next())
                .await
                .unwrap()
                .unwrap();
            let reading = decode_reading(&delivery.body).unwrap();
            assert_eq!(reading.name(), "temp1");
            assert!((reading.value() - 21.5).abs() <= 1.5);
        }

        cancel.cancel();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sensor_stops_when_broker_closes() {
        let broker = Arc::new(InMemoryBroker::new());
        let task = sensor(&broker, "temp1")
            .start(CancellationToken::new())
            .await
            .unwrap();

        broker.close();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
