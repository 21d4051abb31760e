//! Service layer: the discovery protocol and per-source listener lifecycle.
//!
//! - `DiscoveryBroadcaster`: asks sensors to announce themselves
//! - `DiscoveryListener`: consumes announcements, owns the registry
//! - `SourceListener`: one task per source, decode and republish
//! - `ListenerSupervisor`: cancellation and closure tracking for those tasks

pub mod broadcaster;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod listener;
pub mod metrics;
pub mod supervisor;

pub use broadcaster::DiscoveryBroadcaster;
pub use config::{DiscoveryConfig, DEFAULT_DISCOVERY_EXCHANGE, DEFAULT_SHUTDOWN_GRACE};
pub use discovery::{AnnouncementOutcome, DiscoveryListener};
pub use errors::DiscoveryError;
pub use listener::{CloseReason, ListenerContext, SourceListener};
pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use supervisor::{ListenerSupervisor, Reaped, SourceClosed};
