//! # Sensor Coordinator Test Suite
//!
//! Cross-crate tests: the discovery core running against the in-memory
//! broker and the real event bus.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── discovery_flows.rs   # registration, dedup, rediscovery
//!     ├── ingestion_flows.rs   # decode and republish, isolation
//!     └── runtime_flows.rs     # runtime with simulated sensors
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p coordinator-tests
//! cargo test -p coordinator-tests integration::ingestion_flows
//! ```

#![allow(dead_code)]

pub mod integration;
