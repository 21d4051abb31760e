//! Service errors.

use thiserror::Error;

use crate::ports::BrokerError;

/// Errors that stop the discovery loop.
///
/// All of them are setup or connection failures; per-message problems never
/// surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Declaring, binding, consuming or broadcasting failed.
    #[error("Discovery setup failed: {0}")]
    Setup(#[from] BrokerError),

    /// The broker ended the announcement stream.
    #[error("Announcement stream closed by broker")]
    AnnouncementsClosed,
}
