//! Domain layer: pure logic, no I/O.
//!
//! - `SourceRegistry`: which sources currently have a listener
//! - `WireCodec`: the binary reading format shared with sensors

pub mod codec;
pub mod errors;
pub mod registry;

pub use codec::{
    decode_reading, encode_reading, ReadingDecoder, WireCodec, DEFAULT_MAX_PAYLOAD_BYTES,
};
pub use errors::{DecodeError, EncodeError};
pub use registry::SourceRegistry;
