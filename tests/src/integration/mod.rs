//! Integration flows.

pub mod discovery_flows;
#[cfg(test)]
pub mod fixtures;
pub mod ingestion_flows;
pub mod runtime_flows;
