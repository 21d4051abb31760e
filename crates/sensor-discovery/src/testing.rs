//! Centralized Testing Utilities
//!
//! Test helpers shared by the unit tests and the workspace integration tests.
//! Available with the `test-utils` feature flag.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, TelemetryEvent};

use crate::adapters::InMemoryBroker;
use crate::ports::{BrokerChannel, BrokerError, DeliveryStream};

/// Event sink that keeps every published event in order.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Event names in publish order.
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Number of events published under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: TelemetryEvent) -> usize {
        self.events.lock().push(event);
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailPoint {
    DeclareExchange,
    DeclareQueue,
    Bind,
    Publish,
    Consume,
}

/// Broker that fails one operation with [`BrokerError::ChannelClosed`] and
/// forwards everything else to an [`InMemoryBroker`].
pub struct FailingBroker {
    inner: InMemoryBroker,
    fail: FailPoint,
}

impl FailingBroker {
    fn failing(fail: FailPoint) -> Self {
        Self {
            inner: InMemoryBroker::new(),
            fail,
        }
    }

    pub fn on_declare_exchange() -> Self {
        Self::failing(FailPoint::DeclareExchange)
    }

    pub fn on_declare_queue() -> Self {
        Self::failing(FailPoint::DeclareQueue)
    }

    pub fn on_bind() -> Self {
        Self::failing(FailPoint::Bind)
    }

    pub fn on_publish() -> Self {
        Self::failing(FailPoint::Publish)
    }

    pub fn on_consume() -> Self {
        Self::failing(FailPoint::Consume)
    }

    /// The broker operations are forwarded to.
    pub fn inner(&self) -> &InMemoryBroker {
        &self.inner
    }

    fn check(&self, op: FailPoint) -> Result<(), BrokerError> {
        if self.fail == op {
            Err(BrokerError::ChannelClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrokerChannel for FailingBroker {
    async fn declare_fanout_exchange(&self, name: &str) -> Result<(), BrokerError> {
        self.check(FailPoint::DeclareExchange)?;
        self.inner.declare_fanout_exchange(name).await
    }

    async fn declare_queue(&self, name: &str) -> Result<String, BrokerError> {
        self.check(FailPoint::DeclareQueue)?;
        self.inner.declare_queue(name).await
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.check(FailPoint::Bind)?;
        self.inner.bind_queue(queue, exchange, routing_key).await
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.check(FailPoint::Publish)?;
        self.inner.publish(exchange, routing_key, body).await
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        self.check(FailPoint::Consume)?;
        self.inner.consume(queue).await
    }
}

/// Poll `condition` every few milliseconds until it holds.
///
/// # Panics
///
/// Panics if the condition is still false after one second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 1s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
