//! Observability: cache-path telemetry.
//!
//! Table handles report every cache interaction as a [`CacheEvent`]; the
//! connection manager owns the counters and exposes snapshots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// CacheEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Write,
    WriteFailure,
    Invalidation,
    InvalidationFailure,
    DecodeFailure,
}

///
/// CacheMetrics
///
/// Lock-free counters shared by all tables of one connection manager.
///

#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    invalidations: AtomicU64,
    invalidation_failures: AtomicU64,
    decode_failures: AtomicU64,
}

impl CacheMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Hit => &self.hits,
            CacheEvent::Miss => &self.misses,
            CacheEvent::Write => &self.writes,
            CacheEvent::WriteFailure => &self.write_failures,
            CacheEvent::Invalidation => &self.invalidations,
            CacheEvent::InvalidationFailure => &self.invalidation_failures,
            CacheEvent::DecodeFailure => &self.decode_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            invalidation_failures: self.invalidation_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.writes,
            &self.write_failures,
            &self.invalidations,
            &self.invalidation_failures,
            &self.decode_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

///
/// CacheMetricsSnapshot
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub invalidations: u64,
    pub invalidation_failures: u64,
    pub decode_failures: u64,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_their_counters_and_reset_clears_them() {
        let metrics = CacheMetrics::new();
        metrics.record(CacheEvent::Hit);
        metrics.record(CacheEvent::Hit);
        metrics.record(CacheEvent::WriteFailure);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.write_failures, 1);
        assert_eq!(snapshot.misses, 0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), CacheMetricsSnapshot::default());
    }
}
