//! # Coordinator Configuration
//!
//! Unified configuration for the discovery core, the event bus, the simulated
//! sensors and logging, loaded from environment variables.
//!
//! Every value has a default; `validate()` rejects combinations the runtime
//! cannot start with.

use std::env;
use std::time::Duration;

use sensor_discovery::{DiscoveryConfig, SourceId, SourceIdError, DEFAULT_MAX_PAYLOAD_BYTES};
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use thiserror::Error;

/// Largest accepted `COORD_BUS_CAPACITY`; the bus allocates every slot up front.
pub const MAX_BUS_CAPACITY: usize = 1 << 20;

/// Complete coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Exchange names and shutdown grace for the discovery core.
    pub discovery: DiscoveryConfig,
    /// Events buffered per bus subscriber.
    pub bus_capacity: usize,
    /// Largest sensor payload the decoder accepts.
    pub max_payload_bytes: usize,
    /// Simulated sensors to start alongside the coordinator.
    pub sensors: SensorConfig,
    /// Logging output.
    pub logging: LogConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            bus_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            sensors: SensorConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Simulated sensor fleet.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Queue name of each sensor.
    pub names: Vec<SourceId>,
    /// Time between two readings of one sensor.
    pub interval: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            interval: Duration::from_millis(1000),
        }
    }
}

/// Log filter and format.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `sensor_discovery=debug`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A simulated sensor name is not a usable queue name.
    #[error("Invalid sensor name {name:?}: {source}")]
    InvalidSensor {
        name: String,
        #[source]
        source: SourceIdError,
    },

    /// The same sensor name appears twice.
    #[error("Duplicate sensor name: {0}")]
    DuplicateSensor(String),

    /// A value that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A value exceeds its upper bound.
    #[error("{name} is {value}, above the limit of {max}")]
    TooLarge {
        name: &'static str,
        value: usize,
        max: usize,
    },

    /// An exchange name is empty.
    #[error("{0} must not be empty")]
    EmptyExchange(&'static str),

    /// Discovery requests and announcements would share one exchange.
    #[error("Discovery and announce exchanges must differ (both {0:?})")]
    SameExchange(String),
}

impl CoordinatorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `COORD_DISCOVERY_EXCHANGE`: discovery request exchange (default: SensorDiscovery)
    /// - `COORD_ANNOUNCE_EXCHANGE`: announcement exchange (default: amq.fanout)
    /// - `COORD_BUS_CAPACITY`: events buffered per subscriber (default: 1000)
    /// - `COORD_MAX_PAYLOAD_BYTES`: decoder size limit (default: 65536)
    /// - `COORD_SENSORS`: comma-separated simulated sensors (default: none)
    /// - `COORD_SENSOR_INTERVAL_MS`: reading interval (default: 1000)
    /// - `COORD_SHUTDOWN_GRACE_MS`: listener shutdown grace (default: 2000)
    /// - `COORD_LOG_LEVEL` or `RUST_LOG`: log filter (default: info)
    /// - `COORD_JSON_LOGS`: JSON log output (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("COORD_DISCOVERY_EXCHANGE") {
            config.discovery.discovery_exchange = v;
        }
        if let Some(v) = lookup("COORD_ANNOUNCE_EXCHANGE") {
            config.discovery.announce_exchange = v;
        }
        if let Some(v) = lookup("COORD_SHUTDOWN_GRACE_MS") {
            config.discovery.shutdown_grace =
                Duration::from_millis(parse("COORD_SHUTDOWN_GRACE_MS", &v)?);
        }
        if let Some(v) = lookup("COORD_BUS_CAPACITY") {
            config.bus_capacity = parse("COORD_BUS_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("COORD_MAX_PAYLOAD_BYTES") {
            config.max_payload_bytes = parse("COORD_MAX_PAYLOAD_BYTES", &v)?;
        }
        if let Some(v) = lookup("COORD_SENSORS") {
            config.sensors.names = parse_sensors(&v)?;
        }
        if let Some(v) = lookup("COORD_SENSOR_INTERVAL_MS") {
            config.sensors.interval = Duration::from_millis(parse("COORD_SENSOR_INTERVAL_MS", &v)?);
        }
        if let Some(v) = lookup("COORD_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.logging.level = v;
        }
        if let Some(v) = lookup("COORD_JSON_LOGS") {
            config.logging.json = v.eq_ignore_ascii_case("true") || v == "1";
        }

        Ok(config)
    }

    /// Check the configuration can be started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let discovery = &self.discovery;
        if discovery.discovery_exchange.is_empty() {
            return Err(ConfigError::EmptyExchange("discovery exchange"));
        }
        if discovery.announce_exchange.is_empty() {
            return Err(ConfigError::EmptyExchange("announce exchange"));
        }
        if discovery.discovery_exchange == discovery.announce_exchange {
            return Err(ConfigError::SameExchange(discovery.announce_exchange.clone()));
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::Zero("bus capacity"));
        }
        if self.bus_capacity > MAX_BUS_CAPACITY {
            return Err(ConfigError::TooLarge {
                name: "bus capacity",
                value: self.bus_capacity,
                max: MAX_BUS_CAPACITY,
            });
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Zero("max payload bytes"));
        }
        if !self.sensors.names.is_empty() && self.sensors.interval.is_zero() {
            return Err(ConfigError::Zero("sensor interval"));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_sensors(value: &str) -> Result<Vec<SourceId>, ConfigError> {
    let mut names: Vec<SourceId> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let id = SourceId::new(name).map_err(|source| ConfigError::InvalidSensor {
            name: name.to_string(),
            source,
        })?;
        if names.contains(&id) {
            return Err(ConfigError::DuplicateSensor(name.to_string()));
        }
        names.push(id);
    }
    Ok(names)
}
