//! Cache Manager Module
//!
//! Main cache engine: the locked entry map, capacity enforcement, policy
//! dispatch and the auto-cleanup schedule.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

// == Cache Manager ==
/// Bounded payload cache.
///
/// All map access goes through one lock, so every `get`, `set` and cleanup
/// pass is atomic with respect to the others. Share it between threads with
/// `Arc<CacheManager>`. Dropping the manager cancels its auto-cleanup task.
#[derive(Debug)]
pub struct CacheManager {
    core: Arc<CacheCore>,
}

/// State shared with the auto-cleanup task, which only holds a `Weak` to it.
///
/// Lock order is `timer` before `state`.
#[derive(Debug)]
pub(crate) struct CacheCore {
    state: Mutex<CacheState>,
    timer: Mutex<TimerSlot>,
}

#[derive(Debug)]
struct CacheState {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

/// The single auto-cleanup schedule. A task only runs ticks while its
/// generation matches the slot's.
#[derive(Debug, Default)]
struct TimerSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    fn disarm(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Auto-cleanup disarmed");
        }
    }
}

impl CacheState {
    fn is_full(&self) -> bool {
        self.entries.len() >= self.config.capacity
    }

    // == Cleanup Pass ==
    /// Applies the active policy if the store is full. Returns the number of
    /// entries removed.
    fn cleanup(&mut self) -> usize {
        if !self.is_full() {
            debug!(
                size = self.entries.len(),
                capacity = self.config.capacity,
                "Cleanup skipped, cache not full"
            );
            return 0;
        }

        let doomed = self.config.policy.select(&self.entries, Utc::now());
        for key in &doomed {
            self.entries.remove(key);
        }

        let removed = doomed.len();
        self.stats.record_cleanup_pass(removed);

        if removed > 0 {
            info!(
                policy = %self.config.policy,
                removed,
                remaining = self.entries.len(),
                "Cleanup pass evicted entries"
            );
        } else {
            debug!(policy = %self.config.policy, "Cleanup pass found nothing to evict");
        }

        removed
    }
}

impl CacheCore {
    /// Runs one scheduled cleanup tick for the schedule `generation`.
    ///
    /// Returns `false` once the schedule has been superseded, which stops
    /// the task.
    pub(crate) fn run_scheduled_cleanup(&self, generation: u64) -> bool {
        let timer = self.timer.lock();
        if timer.generation != generation {
            return false;
        }

        let mut state = self.state.lock();
        state.stats.record_auto_cleanup_tick();
        state.cleanup();
        true
    }
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager and applies `config`.
    ///
    /// A non-zero auto-cleanup interval must be requested from within a Tokio
    /// runtime.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let manager = Self::default();
        manager.update_config(config)?;
        Ok(manager)
    }

    // == Get ==
    /// Retrieves the payload stored under `key`, recording the access.
    ///
    /// Returns `None` if the key is absent or has been evicted.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut guard = self.core.state.lock();
        let CacheState { entries, stats, .. } = &mut *guard;

        match entries.get_mut(key) {
            Some(entry) => {
                let (payload, touched) = entry.touch();
                *entry = touched;
                stats.record_hit();
                Some(payload)
            }
            None => {
                stats.record_miss();
                debug!(key, "Cache miss");
                None
            }
        }
    }

    // == Set ==
    /// Stores `payload` under `key`, replacing any existing entry and its
    /// access history.
    ///
    /// Inserting a new key into a full cache runs one cleanup pass first. If
    /// the pass frees nothing the cache grows past its capacity.
    pub fn set(&self, key: impl Into<String>, payload: impl Into<Bytes>) {
        let key = key.into();
        let entry = CacheEntry::new(key.clone(), payload.into());

        let mut state = self.core.state.lock();

        if !state.entries.contains_key(&key) && state.is_full() {
            state.cleanup();
        }

        state.entries.insert(key, entry);

        if state.entries.len() > state.config.capacity {
            warn!(
                size = state.entries.len(),
                capacity = state.config.capacity,
                policy = %state.config.policy,
                "Cache above capacity, cleanup freed no slot"
            );
        }
    }

    // == Cleanup ==
    /// Runs the active policy if the cache is full; does nothing otherwise.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        self.core.state.lock().cleanup()
    }

    // == Update Config ==
    /// Replaces the active configuration.
    ///
    /// Any running auto-cleanup schedule is cancelled and, if the new interval
    /// is non-zero, a fresh one is armed. No cleanup pass runs as part of the
    /// swap. A rejected config leaves the previous one and its schedule in
    /// place.
    pub fn update_config(&self, config: CacheConfig) -> Result<()> {
        config.validate()?;

        let runtime = if config.auto_cleanup_enabled() {
            Some(Handle::try_current().map_err(|_| CacheError::NoRuntime)?)
        } else {
            None
        };

        let mut timer = self.core.timer.lock();
        timer.disarm();

        let interval = config.auto_cleanup_interval;
        info!(
            capacity = config.capacity,
            policy = %config.policy,
            auto_cleanup_ms = interval.as_millis() as u64,
            "Cache configuration updated"
        );
        self.core.state.lock().config = config;

        if let Some(runtime) = runtime {
            let handle = spawn_cleanup_task(
                &runtime,
                Arc::downgrade(&self.core),
                interval,
                timer.generation,
            );
            timer.handle = Some(handle);
        }

        Ok(())
    }

    // == Accessors ==
    /// Returns a copy of the active configuration.
    pub fn config(&self) -> CacheConfig {
        self.core.state.lock().config.clone()
    }

    /// Returns `true` once the entry count has reached capacity.
    pub fn is_full(&self) -> bool {
        self.core.state.lock().is_full()
    }

    /// Returns the current number of entries.
    pub fn size(&self) -> usize {
        self.core.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.state.lock().entries.is_empty()
    }

    /// Returns a snapshot of the entry under `key` without recording an access.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.core.state.lock().entries.get(key).cloned()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.core.state.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats
    }

    /// Whether an auto-cleanup schedule is currently active.
    pub fn is_auto_cleanup_armed(&self) -> bool {
        self.core.timer.lock().handle.is_some()
    }
}

impl Default for CacheManager {
    /// An unarmed manager with the default configuration.
    fn default() -> Self {
        Self {
            core: Arc::new(CacheCore {
                state: Mutex::new(CacheState {
                    config: CacheConfig::default(),
                    entries: HashMap::new(),
                    stats: CacheStats::new(),
                }),
                timer: Mutex::new(TimerSlot::default()),
            }),
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.core.timer.lock().disarm();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CleanupPolicy;
    use std::thread::sleep;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn manager_with(capacity: usize, policy: CleanupPolicy) -> CacheManager {
        CacheManager::new(
            CacheConfig::default()
                .with_capacity(capacity)
                .with_policy(policy),
        )
        .unwrap()
    }

    fn payload() -> Bytes {
        Bytes::from(vec![0u8; 10])
    }

    #[test]
    fn test_manager_default() {
        let manager = CacheManager::default();
        assert_eq!(manager.size(), 0);
        assert!(manager.is_empty());
        assert!(!manager.is_full());
        assert_eq!(manager.config(), CacheConfig::default());
        assert!(!manager.is_auto_cleanup_armed());
    }

    #[test]
    fn test_set_and_get() {
        let manager = CacheManager::default();

        manager.set("key1", Bytes::from_static(b"value1"));

        assert_eq!(manager.get("key1"), Some(Bytes::from_static(b"value1")));
        assert_eq!(manager.size(), 1);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let manager = CacheManager::default();

        assert_eq!(manager.get("missing"), None);
        assert_eq!(manager.stats().misses, 1);
    }

    #[test]
    fn test_get_updates_bookkeeping() {
        let manager = CacheManager::default();
        manager.set("key", payload());
        let created = manager.peek("key").unwrap();

        sleep(Duration::from_millis(2));
        manager.get("key").unwrap();

        let touched = manager.peek("key").unwrap();
        assert_eq!(created.access_count(), 0);
        assert_eq!(touched.access_count(), 1);
        assert!(touched.last_accessed_at() > created.last_accessed_at());
        assert_eq!(touched.created_at(), created.created_at());
    }

    #[test]
    fn test_peek_does_not_touch() {
        let manager = CacheManager::default();
        manager.set("key", payload());

        manager.peek("key");
        manager.peek("key");

        assert_eq!(manager.peek("key").unwrap().access_count(), 0);
        assert_eq!(manager.stats().hits, 0);
    }

    #[test]
    fn test_set_overwrite_resets_bookkeeping() {
        let manager = CacheManager::default();
        manager.set("key", Bytes::from_static(b"old"));
        manager.get("key");
        manager.get("key");

        manager.set("key", Bytes::from_static(b"new"));

        let entry = manager.peek("key").unwrap();
        assert_eq!(entry.access_count(), 0);
        assert_eq!(entry.payload(), &Bytes::from_static(b"new"));
        assert_eq!(manager.size(), 1);
    }

    #[test]
    fn test_overwrite_when_full_skips_cleanup() {
        let manager = manager_with(2, CleanupPolicy::ClearAll);
        manager.set("a", payload());
        manager.set("b", payload());

        manager.set("a", Bytes::from_static(b"again"));

        assert_eq!(manager.size(), 2);
        assert_eq!(manager.stats().cleanup_passes, 0);
    }

    #[test]
    fn test_below_frequency_scenario() {
        let manager = manager_with(3, CleanupPolicy::EvictBelowFrequency { threshold: 10 });
        manager.set("a", payload());
        manager.set("b", payload());
        manager.set("c", payload());
        assert_eq!(manager.size(), 3);
        assert!(manager.is_full());

        for _ in 0..10 {
            manager.get("a");
        }
        for _ in 0..2 {
            manager.get("b");
        }
        manager.get("c");

        manager.set("d", payload());

        assert_eq!(manager.size(), 2);
        assert_eq!(manager.get("b"), None);
        assert_eq!(manager.get("c"), None);
        assert_eq!(manager.get("a"), Some(payload()));
        assert!(manager.peek("d").is_some());
    }

    #[test]
    fn test_lru_scenario() {
        let manager = manager_with(3, CleanupPolicy::EvictLeastRecentlyUsed);
        manager.set("a", payload());
        manager.set("b", payload());
        manager.set("c", payload());

        sleep(Duration::from_millis(2));
        manager.get("a");
        sleep(Duration::from_millis(2));
        manager.get("c");

        assert_eq!(manager.cleanup(), 1);
        assert_eq!(manager.size(), 2);
        assert!(manager.peek("b").is_none());
        assert!(manager.peek("a").is_some());
        assert!(manager.peek("c").is_some());
    }

    #[test]
    fn test_clear_all_empties_cache() {
        let manager = manager_with(3, CleanupPolicy::ClearAll);
        manager.set("a", payload());
        manager.set("b", payload());
        manager.set("c", payload());

        assert_eq!(manager.cleanup(), 3);
        assert_eq!(manager.size(), 0);
    }

    #[test]
    fn test_cleanup_below_capacity_is_noop() {
        let manager = manager_with(3, CleanupPolicy::ClearAll);
        manager.set("a", payload());
        manager.set("b", payload());

        assert_eq!(manager.cleanup(), 0);
        assert_eq!(manager.cleanup(), 0);
        assert_eq!(manager.size(), 2);
        assert_eq!(manager.stats().cleanup_passes, 0);
    }

    #[test]
    fn test_set_may_exceed_capacity_when_nothing_evictable() {
        let manager = manager_with(2, CleanupPolicy::EvictBelowFrequency { threshold: 1 });
        manager.set("a", payload());
        manager.set("b", payload());
        manager.get("a");
        manager.get("b");

        manager.set("c", payload());

        assert_eq!(manager.size(), 3);
        assert_eq!(manager.stats().cleanup_passes, 1);
        assert_eq!(manager.stats().evictions, 0);
    }

    #[test]
    fn test_stats_tracks_activity() {
        let manager = manager_with(1, CleanupPolicy::EvictLeastRecentlyUsed);
        manager.set("a", payload());
        manager.get("a");
        manager.get("missing");
        manager.set("b", payload());

        let stats = manager.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.cleanup_passes, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_update_config_rejects_zero_capacity() {
        let manager = CacheManager::default();

        let result = manager.update_config(CacheConfig::default().with_capacity(0));

        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
        assert_eq!(manager.config(), CacheConfig::default());
    }

    #[test]
    fn test_update_config_without_runtime_is_rejected() {
        let manager = CacheManager::default();

        let result = manager.update_config(
            CacheConfig::default().with_auto_cleanup_interval(Duration::from_secs(1)),
        );

        assert_eq!(assert_err!(result), CacheError::NoRuntime);
        assert_eq!(manager.config(), CacheConfig::default());
        assert!(!manager.is_auto_cleanup_armed());
    }

    #[test]
    fn test_update_config_does_not_clean() {
        let manager = CacheManager::default();
        manager.set("a", payload());
        manager.set("b", payload());

        assert_ok!(manager.update_config(
            CacheConfig::default()
                .with_capacity(1)
                .with_policy(CleanupPolicy::ClearAll)
        ));

        assert_eq!(manager.size(), 2);
        assert!(manager.is_full());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_cleanup_runs_on_interval() {
        let manager = manager_with(2, CleanupPolicy::ClearAll);
        manager.set("a", payload());
        manager.set("b", payload());

        assert_ok!(manager.update_config(
            manager
                .config()
                .with_auto_cleanup_interval(Duration::from_millis(100))
        ));
        assert!(manager.is_auto_cleanup_armed());
        // Arming alone does not clean
        assert_eq!(manager.size(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(manager.size(), 0);
        let stats = manager.stats();
        assert_eq!(stats.auto_cleanup_ticks, 1);
        assert_eq!(stats.cleanup_passes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_keeps_single_schedule() {
        let manager = CacheManager::default();
        let config = CacheConfig::default().with_auto_cleanup_interval(Duration::from_millis(100));

        assert_ok!(manager.update_config(config.clone()));
        assert_ok!(manager.update_config(config));

        tokio::time::sleep(Duration::from_millis(450)).await;

        assert_eq!(manager.stats().auto_cleanup_ticks, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disarms() {
        let manager = CacheManager::default();
        assert_ok!(manager.update_config(
            CacheConfig::default().with_auto_cleanup_interval(Duration::from_millis(100))
        ));

        assert_ok!(manager.update_config(CacheConfig::default()));
        assert!(!manager.is_auto_cleanup_armed());

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(manager.stats().auto_cleanup_ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_shared_state() {
        let manager = CacheManager::new(
            CacheConfig::default().with_auto_cleanup_interval(Duration::from_millis(100)),
        )
        .unwrap();
        let core = Arc::downgrade(&manager.core);

        drop(manager);
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(core.upgrade().is_none());
    }

    #[test]
    fn test_stale_generation_tick_is_ignored() {
        let manager = manager_with(1, CleanupPolicy::ClearAll);
        manager.set("a", payload());

        let current = manager.core.timer.lock().generation;
        assert!(!manager.core.run_scheduled_cleanup(current + 1));
        assert_eq!(manager.size(), 1);

        assert!(manager.core.run_scheduled_cleanup(current));
        assert_eq!(manager.size(), 0);
    }
}
