//! # Driven Ports (Outbound SPI)
//!
//! The broker substrate this crate **requires** the host to provide.
//!
//! The contract follows AMQP 0-9-1 semantics without tying the core to a
//! client library: named fanout exchanges, the nameless default exchange
//! that routes by queue name, server-named auto-delete queues, and consumers
//! that see deliveries as an unbounded stream with automatic acknowledgment.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Exchange the message was published to (`""` for the default exchange).
    pub exchange: String,
    /// Routing key supplied by the publisher.
    pub routing_key: String,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Delivery {
    /// Create a delivery.
    #[must_use]
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body,
        }
    }
}

/// Deliveries for one consumer, in receipt order. Ends when the queue is
/// deleted or the connection closes.
pub type DeliveryStream = BoxStream<'static, Delivery>;

/// Errors from broker operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The connection or channel is gone.
    #[error("Broker channel closed")]
    ChannelClosed,

    /// Publishing or binding to an exchange that was never declared.
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),

    /// Binding or consuming a queue that does not exist.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The queue already has its consumer.
    #[error("Queue already has a consumer: {0}")]
    ConsumerExists(String),

    /// Any other broker-side refusal.
    #[error("Broker operation failed: {0}")]
    Operation(String),
}

/// Abstract interface for the publish/subscribe broker.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the discovery loop and every
/// listener task share one channel.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Declare a non-durable fanout exchange. Idempotent.
    async fn declare_fanout_exchange(&self, name: &str) -> Result<(), BrokerError>;

    /// Declare a queue and return its name.
    ///
    /// An empty `name` asks the broker for a uniquely named, exclusive queue
    /// that is deleted when its consumer goes away. Named declarations are
    /// idempotent.
    async fn declare_queue(&self, name: &str) -> Result<String, BrokerError>;

    /// Bind `queue` to `exchange`.
    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str)
        -> Result<(), BrokerError>;

    /// Publish `body`. Unroutable messages are dropped silently.
    async fn publish(&self, exchange: &str, routing_key: &str, body: Vec<u8>)
        -> Result<(), BrokerError>;

    /// Start consuming `queue` with automatic acknowledgment.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError>;
}
