//! Aggregator metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// In-process aggregation counters
///
/// Accumulated across `collect` calls on the same aggregator; the
/// Prometheus side is fed separately through `observability`.
#[derive(Debug, Default)]
pub struct AggregatorMetrics {
    /// Collector runs started
    pub collectors_run: AtomicU64,

    /// Collector runs that errored or panicked
    pub collectors_failed: AtomicU64,

    /// Raw candidates received from collectors
    pub records_received: AtomicU64,

    /// Candidates rejected by the validity filter
    pub records_dropped: AtomicU64,

    /// Candidates discarded as duplicates
    pub duplicates: AtomicU64,

    /// Canonical records emitted
    pub records_accepted: AtomicU64,
}

impl AggregatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_collector_run(&self, failed: bool) {
        self.collectors_run.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.collectors_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_received(&self, count: usize) {
        self.records_received
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            collectors_run: self.collectors_run.load(Ordering::Relaxed),
            collectors_failed: self.collectors_failed.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub collectors_run: u64,
    pub collectors_failed: u64,
    pub records_received: u64,
    pub records_dropped: u64,
    pub duplicates: u64,
    pub records_accepted: u64,
}
