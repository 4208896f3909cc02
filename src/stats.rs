use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of coordinator activity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the local tier
    pub local_hits: u64,
    /// Lookups answered by the remote tier
    pub remote_hits: u64,
    /// Lookups that found nothing valid in either tier
    pub misses: u64,
    /// Producer invocations
    pub producer_runs: u64,
    /// Misses that awaited another caller's in-flight producer
    pub coalesced: u64,
    pub producer_errors: u64,
    pub remote_write_failures: u64,
    /// Values returned but not cached because they exceeded a size limit
    pub oversized_skips: u64,
    pub invalidations: u64,
    /// Entries currently held by the local tier, valid or not
    pub local_entries: usize,
    /// Producers currently running
    pub in_flight: usize,
}

impl CacheStats {
    /// Share of lookups answered by either tier.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.remote_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
    misses: AtomicU64,
    producer_runs: AtomicU64,
    coalesced: AtomicU64,
    producer_errors: AtomicU64,
    remote_write_failures: AtomicU64,
    oversized_skips: AtomicU64,
    invalidations: AtomicU64,
}

macro_rules! recorder {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl StatsRecorder {
            $(
                pub(crate) fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

recorder! {
    local_hit => local_hits,
    remote_hit => remote_hits,
    miss => misses,
    producer_run => producer_runs,
    coalesced => coalesced,
    producer_error => producer_errors,
    remote_write_failure => remote_write_failures,
    oversized_skip => oversized_skips,
    invalidation => invalidations,
}

impl StatsRecorder {
    pub(crate) fn snapshot(&self, local_entries: usize, in_flight: usize) -> CacheStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CacheStats {
            local_hits: load(&self.local_hits),
            remote_hits: load(&self.remote_hits),
            misses: load(&self.misses),
            producer_runs: load(&self.producer_runs),
            coalesced: load(&self.coalesced),
            producer_errors: load(&self.producer_errors),
            remote_write_failures: load(&self.remote_write_failures),
            oversized_skips: load(&self.oversized_skips),
            invalidations: load(&self.invalidations),
            local_entries,
            in_flight,
        }
    }
}
