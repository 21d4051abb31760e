//! Ingestion counters.
//!
//! Shared between the discovery loop and every listener task; they are plain
//! atomics so no task ever waits on another to record something.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one coordinator instance.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    announcements: AtomicU64,
    invalid_announcements: AtomicU64,
    duplicate_announcements: AtomicU64,
    sources_discovered: AtomicU64,
    sources_closed: AtomicU64,
    readings_published: AtomicU64,
    decode_failures: AtomicU64,
}

/// Point-in-time copy of [`IngestMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub announcements: u64,
    pub invalid_announcements: u64,
    pub duplicate_announcements: u64,
    pub sources_discovered: u64,
    pub sources_closed: u64,
    pub readings_published: u64,
    pub decode_failures: u64,
}

impl IngestMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_announcement(&self) {
        self.announcements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_announcement(&self) {
        self.invalid_announcements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicate_announcements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discovered(&self) {
        self.sources_discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed(&self) {
        self.sources_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reading(&self) {
        self.readings_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            announcements: self.announcements.load(Ordering::Relaxed),
            invalid_announcements: self.invalid_announcements.load(Ordering::Relaxed),
            duplicate_announcements: self.duplicate_announcements.load(Ordering::Relaxed),
            sources_discovered: self.sources_discovered.load(Ordering::Relaxed),
            sources_closed: self.sources_closed.load(Ordering::Relaxed),
            readings_published: self.readings_published.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}
