//! Discovery configuration.

use std::time::Duration;

use crate::adapters::AMQ_FANOUT;

/// Exchange the coordinator publishes discovery requests to.
pub const DEFAULT_DISCOVERY_EXCHANGE: &str = "SensorDiscovery";

/// How long shutdown waits for listener tasks before aborting them.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Names and limits for the discovery protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Fanout exchange carrying discovery requests to sensors.
    pub discovery_exchange: String,
    /// Fanout exchange sensors announce their queue names on.
    pub announce_exchange: String,
    /// Grace period for listener tasks on shutdown.
    pub shutdown_grace: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discovery_exchange: DEFAULT_DISCOVERY_EXCHANGE.to_string(),
            announce_exchange: AMQ_FANOUT.to_string(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
