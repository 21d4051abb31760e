//! # In-Memory Broker
//!
//! A single-process stand-in for the AMQP broker.
//!
//! Supports what the discovery protocol uses:
//! - fanout exchanges (`amq.fanout` is pre-declared)
//! - the default exchange, routing by queue name
//! - server-named queues that vanish with their consumer
//! - one consumer per queue; a named queue keeps its backlog for the next
//!   consumer when the current one goes away
//!
//! Deleting a queue ends its consumer's stream, which is how tests and the
//! simulator model a sensor going offline.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::ports::{BrokerChannel, BrokerError, Delivery, DeliveryStream};

/// The nameless direct exchange every queue is implicitly bound to.
pub const DEFAULT_EXCHANGE: &str = "";

/// Pre-declared fanout exchange sensors announce on.
pub const AMQ_FANOUT: &str = "amq.fanout";

struct QueueState {
    incarnation: u64,
    sender: mpsc::UnboundedSender<Delivery>,
    /// `None` while a consumer holds it.
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
    auto_delete: bool,
}

#[derive(Default)]
struct BrokerState {
    /// Fanout exchange name → bound queue names.
    exchanges: HashMap<String, HashSet<String>>,
    queues: HashMap<String, QueueState>,
    next_incarnation: u64,
    closed: bool,
}

impl BrokerState {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed {
            Err(BrokerError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    fn insert_queue(&mut self, name: String, auto_delete: bool) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.next_incarnation += 1;
        self.queues.insert(
            name,
            QueueState {
                incarnation: self.next_incarnation,
                sender,
                receiver: Some(receiver),
                auto_delete,
            },
        );
    }

    fn remove_queue(&mut self, name: &str) -> bool {
        for bound in self.exchanges.values_mut() {
            bound.remove(name);
        }
        self.queues.remove(name).is_some()
    }

    fn enqueue(&self, queue: &str, delivery: Delivery) {
        if let Some(state) = self.queues.get(queue) {
            // Receiver lives in the queue or its consumer; send only fails
            // while the queue is being torn down.
            let _ = state.sender.send(delivery);
        }
    }
}

/// Consumer side of one queue.
struct QueueConsumer {
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
    state: Weak<Mutex<BrokerState>>,
    queue: String,
    incarnation: u64,
    auto_delete: bool,
}

impl Stream for QueueConsumer {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for QueueConsumer {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        let current = state
            .queues
            .get(&self.queue)
            .map(|q| q.incarnation == self.incarnation)
            .unwrap_or(false);
        if !current {
            return;
        }

        if self.auto_delete {
            state.remove_queue(&self.queue);
            debug!(queue = %self.queue, "Auto-delete queue removed");
        } else if let Some(queue) = state.queues.get_mut(&self.queue) {
            queue.receiver = self.receiver.take();
            trace!(queue = %self.queue, "Consumer released queue");
        }
    }
}

/// In-memory implementation of [`BrokerChannel`].
///
/// Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Create a broker with `amq.fanout` declared.
    #[must_use]
    pub fn new() -> Self {
        let mut state = BrokerState::default();
        state.exchanges.insert(AMQ_FANOUT.to_string(), HashSet::new());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Delete a queue, ending its consumer's stream once the backlog drains.
    ///
    /// Returns `true` if the queue existed.
    pub fn delete_queue(&self, name: &str) -> bool {
        let removed = self.state.lock().remove_queue(name);
        if removed {
            debug!(queue = %name, "Queue deleted");
        }
        removed
    }

    /// Close the broker: every stream ends and further calls fail.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.queues.clear();
        state.exchanges.clear();
        debug!("Broker closed");
    }

    /// Whether a queue exists.
    #[must_use]
    pub fn has_queue(&self, name: &str) -> bool {
        self.state.lock().queues.contains_key(name)
    }

    /// Whether an exchange exists.
    #[must_use]
    pub fn has_exchange(&self, name: &str) -> bool {
        self.state.lock().exchanges.contains_key(name)
    }

    /// Whether a queue currently has a consumer.
    #[must_use]
    pub fn is_consumed(&self, name: &str) -> bool {
        self.state
            .lock()
            .queues
            .get(name)
            .map(|q| q.receiver.is_none())
            .unwrap_or(false)
    }

    /// Number of queues bound to an exchange.
    #[must_use]
    pub fn bound_queues(&self, exchange: &str) -> usize {
        self.state
            .lock()
            .exchanges
            .get(exchange)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerChannel for InMemoryBroker {
    async fn declare_fanout_exchange(&self, name: &str) -> Result<(), BrokerError> {
        if name.is_empty() {
            return Err(BrokerError::Operation(
                "cannot redeclare the default exchange".to_string(),
            ));
        }
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.exchanges.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn declare_queue(&self, name: &str) -> Result<String, BrokerError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        if name.is_empty() {
            let generated = format!("amq.gen-{}", uuid::Uuid::new_v4().simple());
            state.insert_queue(generated.clone(), true);
            trace!(queue = %generated, "Anonymous queue declared");
            return Ok(generated);
        }

        if !state.queues.contains_key(name) {
            state.insert_queue(name.to_string(), false);
            trace!(queue = %name, "Queue declared");
        }
        Ok(name.to_string())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        _routing_key: &str,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        if !state.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound(queue.to_string()));
        }
        let bound = state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;
        bound.insert(queue.to_string());
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let state = self.state.lock();
        state.ensure_open()?;

        if exchange == DEFAULT_EXCHANGE {
            state.enqueue(routing_key, Delivery::new(exchange, routing_key, body));
            return Ok(());
        }

        let bound = state
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;
        for queue in bound {
            state.enqueue(queue, Delivery::new(exchange, routing_key, body.clone()));
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let entry = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        let receiver = entry
            .receiver
            .take()
            .ok_or_else(|| BrokerError::ConsumerExists(queue.to_string()))?;

        Ok(QueueConsumer {
            receiver: Some(receiver),
            state: Arc::downgrade(&self.state),
            queue: queue.to_string(),
            incarnation: entry.incarnation,
            auto_delete: entry.auto_delete,
        }
        .boxed())
    }
}
