//! Domain Errors for the wire codec

use thiserror::Error;

/// Why a raw payload could not be turned into a reading.
///
/// Always local to one message: the listener logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Zero-length body.
    #[error("Empty payload")]
    Empty,

    /// Body larger than the configured limit; not deserialised.
    #[error("Payload too large: {size} bytes, max {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Body ended before the structure was complete.
    #[error("Truncated payload")]
    Truncated,

    /// Body does not match the reading layout.
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Why a reading could not be serialised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Encoded form would exceed the payload limit.
    #[error("Encoded reading exceeds {max} bytes")]
    PayloadTooLarge { max: usize },

    /// Serializer failure.
    #[error("Failed to encode reading: {0}")]
    Serialization(String),
}
