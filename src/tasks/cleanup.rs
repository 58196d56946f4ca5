//! Auto-Cleanup Task
//!
//! Background task that periodically runs a cleanup pass on the cache.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::CacheCore;

/// Spawns a task that runs a cleanup pass every `interval`.
///
/// The task holds only a weak reference to the cache, so it never keeps a
/// dropped cache alive. It exits on the first tick after the cache is gone or
/// after its `generation` has been superseded by a newer schedule.
///
/// # Arguments
/// * `runtime` - Runtime the task is spawned on
/// * `core` - Weak reference to the cache's shared state
/// * `interval` - Period between cleanup passes, must be non-zero
/// * `generation` - Schedule generation this task belongs to
///
/// # Returns
/// A JoinHandle for the spawned task, aborted when the schedule is replaced
/// or the cache is dropped.
pub(crate) fn spawn_cleanup_task(
    runtime: &Handle,
    core: Weak<CacheCore>,
    interval: Duration,
    generation: u64,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            generation, "Starting auto-cleanup task"
        );

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(cache) = core.upgrade() else {
                debug!(generation, "Cache dropped, stopping auto-cleanup task");
                break;
            };

            if !cache.run_scheduled_cleanup(generation) {
                debug!(generation, "Schedule superseded, stopping auto-cleanup task");
                break;
            }
        }
    })
}
