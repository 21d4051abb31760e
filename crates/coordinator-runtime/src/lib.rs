//! # Sensor Coordinator Runtime
//!
//! Configuration, logging bootstrap, simulated sensors and the runtime that
//! ties the discovery core to the broker and the event bus.
//!
//! ## Modules
//!
//! - `config` - environment-driven configuration and validation
//! - `telemetry` - `tracing` subscriber setup
//! - `simulator` - sensors that speak the discovery protocol
//! - `runtime` - startup, event logging and graceful shutdown

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod runtime;
pub mod simulator;
pub mod telemetry;

pub use config::{ConfigError, CoordinatorConfig, LogConfig, SensorConfig, MAX_BUS_CAPACITY};
pub use runtime::{spawn_event_logger, CoordinatorRuntime, RunSummary};
pub use simulator::SimulatedSensor;
pub use telemetry::{init_logging, TelemetryError};
