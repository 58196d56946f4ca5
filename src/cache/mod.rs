//! Cache Module
//!
//! Provides a bounded in-memory payload cache with pluggable cleanup policies.

mod entry;
mod manager;
mod policy;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use manager::CacheManager;
pub use policy::CleanupPolicy;
pub use stats::CacheStats;

pub(crate) use manager::CacheCore;
