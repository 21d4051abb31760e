//! # Discovery Broadcaster
//!
//! Asks every online sensor to announce itself.

use std::sync::Arc;

use tracing::debug;

use crate::ports::{BrokerChannel, BrokerError};

/// Publishes discovery requests.
pub struct DiscoveryBroadcaster {
    broker: Arc<dyn BrokerChannel>,
    exchange: String,
}

impl DiscoveryBroadcaster {
    pub fn new(broker: Arc<dyn BrokerChannel>, exchange: impl Into<String>) -> Self {
        Self {
            broker,
            exchange: exchange.into(),
        }
    }

    /// Exchange requests go to.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Declare the discovery exchange and publish an empty request.
    ///
    /// Failures are returned as-is; there is no retry.
    pub async fn broadcast(&self) -> Result<(), BrokerError> {
        self.broker.declare_fanout_exchange(&self.exchange).await?;
        self.broker.publish(&self.exchange, "", Vec::new()).await?;
        debug!(exchange = %self.exchange, "Discovery request broadcast");
        Ok(())
    }
}
