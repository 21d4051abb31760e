//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `SourceId`
//! - **Readings**: `SensorReading`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SourceIdError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Maximum length of a source identifier in bytes.
///
/// Matches the AMQP short-string limit for queue names.
pub const MAX_SOURCE_ID_LEN: usize = 255;

/// Name of a sensor's dedicated data queue.
///
/// The same string is the broker queue name, the registry key and the suffix
/// of the `MessageReceived_<id>` event name. It arrives from the network, so
/// construction always validates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Validate and wrap an identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, SourceIdError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Parse an identifier from a raw announcement body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SourceIdError> {
        // Length first so an oversized body is never UTF-8 scanned.
        if bytes.len() > MAX_SOURCE_ID_LEN {
            return Err(SourceIdError::TooLong {
                len: bytes.len(),
                max: MAX_SOURCE_ID_LEN,
            });
        }
        let id = std::str::from_utf8(bytes).map_err(|_| SourceIdError::InvalidUtf8)?;
        Self::new(id)
    }

    fn validate(id: &str) -> Result<(), SourceIdError> {
        if id.is_empty() {
            return Err(SourceIdError::Empty);
        }
        if id.len() > MAX_SOURCE_ID_LEN {
            return Err(SourceIdError::TooLong {
                len: id.len(),
                max: MAX_SOURCE_ID_LEN,
            });
        }
        if let Some((position, _)) = id.char_indices().find(|(_, c)| c.is_control()) {
            return Err(SourceIdError::ControlCharacter { position });
        }
        Ok(())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SourceId {
    type Err = SourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SourceId {
    type Error = SourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

// =============================================================================
// CLUSTER B: READINGS
// =============================================================================

/// A decoded sensor reading.
///
/// Field order is part of the wire contract shared with the sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    name: String,
    timestamp: DateTime<Utc>,
    value: f64,
}

impl SensorReading {
    /// Create a reading.
    #[must_use]
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            value,
        }
    }

    /// Sensor name reported in the payload.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time the sensor took the reading.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Measured value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}
