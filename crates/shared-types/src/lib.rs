//! # Shared Types Crate
//!
//! Entities that cross crate boundaries in the coordinator workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `SourceId` and `SensorReading` are defined
//!   here and nowhere else.
//! - **Validated Identity**: a `SourceId` can only be built through
//!   validation, so every identifier held by the bus or the registry is a
//!   usable broker queue name.
//! - **Immutable Readings**: a `SensorReading` exposes accessors only.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
