//! Payload Cache - A bounded in-process key/value cache
//!
//! Stores opaque payloads under string keys (typically resource URLs) and
//! evicts entries with a configurable cleanup policy once capacity is
//! reached, optionally on a recurring timer as well.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use bytes::Bytes;
pub use cache::{CacheEntry, CacheManager, CacheStats, CleanupPolicy};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
