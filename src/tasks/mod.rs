//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Auto-cleanup: Runs the cache's cleanup policy at the configured interval

mod cleanup;

pub(crate) use cleanup::spawn_cleanup_task;
