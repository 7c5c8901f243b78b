//! Broadcaster metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters for one broadcaster
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Total messages broadcast
    broadcast_count: AtomicU64,
    /// Total successful channel writes
    write_count: AtomicU64,
    /// Total channel write failures
    failure_count: AtomicU64,
    /// Total channels ever registered
    registered_count: AtomicU64,
    /// Total channels removed (unregister or write failure)
    removed_count: AtomicU64,
}

impl BroadcastMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast_count(&self) -> u64 {
        self.broadcast_count.load(Ordering::Relaxed)
    }

    pub fn inc_broadcast_count(&self) {
        self.broadcast_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn add_write_count(&self, n: u64) {
        self.write_count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn registered_count(&self) -> u64 {
        self.registered_count.load(Ordering::Relaxed)
    }

    pub fn inc_registered_count(&self) {
        self.registered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn removed_count(&self) -> u64 {
        self.removed_count.load(Ordering::Relaxed)
    }

    pub fn inc_removed_count(&self) {
        self.removed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            broadcast_count: self.broadcast_count(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            registered_count: self.registered_count(),
            removed_count: self.removed_count(),
        }
    }
}

/// Snapshot of broadcaster metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub broadcast_count: u64,
    pub write_count: u64,
    pub failure_count: u64,
    pub registered_count: u64,
    pub removed_count: u64,
}
