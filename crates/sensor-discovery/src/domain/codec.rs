//! # Wire Codec
//!
//! The binary reading format shared with the sensors.
//!
//! ## Layout
//!
//! bincode, fixed-width little-endian integers, no trailing bytes:
//!
//! | Field | Encoding |
//! |-------|----------|
//! | name | `u64` byte length + UTF-8 bytes |
//! | timestamp | `i64` microseconds since the Unix epoch |
//! | value | `f64` |
//!
//! Payloads come from the network: the size is checked before anything is
//! deserialised, and the same limit bounds every length prefix.

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::SensorReading;

use super::errors::{DecodeError, EncodeError};

/// Default upper bound on a single reading payload.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Turns raw payload bytes into a reading.
///
/// Implementations must be pure and must not panic on any input.
pub trait ReadingDecoder: Send + Sync {
    /// Decode one payload.
    fn decode(&self, raw: &[u8]) -> Result<SensorReading, DecodeError>;
}

/// Field order here is the wire contract.
#[derive(Serialize, Deserialize)]
struct WireReading {
    name: String,
    #[serde(with = "chrono::serde::ts_microseconds")]
    timestamp: DateTime<Utc>,
    value: f64,
}

/// bincode codec for sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    max_payload_bytes: usize,
}

impl WireCodec {
    /// Create a codec accepting payloads up to `max_payload_bytes`.
    #[must_use]
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    /// Largest payload this codec accepts or produces.
    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    fn options(&self) -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .with_limit(self.max_payload_bytes as u64)
            .reject_trailing_bytes()
    }

    /// Encode a reading as a sensor would.
    pub fn encode(&self, reading: &SensorReading) -> Result<Vec<u8>, EncodeError> {
        let wire = WireReading {
            name: reading.name().to_owned(),
            timestamp: reading.timestamp(),
            value: reading.value(),
        };
        self.options().serialize(&wire).map_err(|err| match *err {
            bincode::ErrorKind::SizeLimit => EncodeError::PayloadTooLarge {
                max: self.max_payload_bytes,
            },
            ref other => EncodeError::Serialization(other.to_string()),
        })
    }

    /// Decode a payload into a reading.
    pub fn decode(&self, raw: &[u8]) -> Result<SensorReading, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        if raw.len() > self.max_payload_bytes {
            return Err(DecodeError::PayloadTooLarge {
                size: raw.len(),
                max: self.max_payload_bytes,
            });
        }

        let wire: WireReading = self.options().deserialize(raw).map_err(map_decode_error)?;
        Ok(SensorReading::new(wire.name, wire.timestamp, wire.value))
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_BYTES)
    }
}

impl ReadingDecoder for WireCodec {
    fn decode(&self, raw: &[u8]) -> Result<SensorReading, DecodeError> {
        WireCodec::decode(self, raw)
    }
}

fn map_decode_error(err: bincode::Error) -> DecodeError {
    match *err {
        bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            DecodeError::Truncated
        }
        bincode::ErrorKind::SizeLimit => {
            DecodeError::Malformed("declared length exceeds payload limit".to_string())
        }
        ref other => DecodeError::Malformed(other.to_string()),
    }
}

/// Decode with the default payload limit.
pub fn decode_reading(raw: &[u8]) -> Result<SensorReading, DecodeError> {
    WireCodec::default().decode(raw)
}

/// Encode with the default payload limit.
pub fn encode_reading(reading: &SensorReading) -> Result<Vec<u8>, EncodeError> {
    WireCodec::default().encode(reading)
}
