//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, evictions and cleanup passes.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of reads that found their key
    pub hits: u64,
    /// Number of reads that found nothing
    pub misses: u64,
    /// Number of entries removed by cleanup passes
    pub evictions: u64,
    /// Number of cleanup passes that evaluated the policy
    pub cleanup_passes: u64,
    /// Number of ticks run by the auto-cleanup schedule
    pub auto_cleanup_ticks: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Records one policy evaluation and the entries it removed.
    pub(crate) fn record_cleanup_pass(&mut self, removed: usize) {
        self.cleanup_passes += 1;
        self.evictions += removed as u64;
    }

    pub(crate) fn record_auto_cleanup_tick(&mut self) {
        self.auto_cleanup_ticks += 1;
    }
}
