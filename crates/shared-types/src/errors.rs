//! # Error Types
//!
//! Defines error types shared across crates.

use thiserror::Error;

/// Reasons an announced source identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceIdError {
    /// Identifier has no characters.
    #[error("Source identifier is empty")]
    Empty,

    /// Identifier exceeds the broker's queue-name limit.
    #[error("Source identifier too long: {len} bytes, max {max}")]
    TooLong { len: usize, max: usize },

    /// Announcement body is not valid UTF-8.
    #[error("Source identifier is not valid UTF-8")]
    InvalidUtf8,

    /// Identifier contains a control character.
    #[error("Source identifier contains a control character at byte {position}")]
    ControlCharacter { position: usize },
}
