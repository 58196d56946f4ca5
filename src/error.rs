//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Lookups never fail: a missing key is reported as `None`. Errors only
/// arise when a configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Configuration value is out of range or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Auto-cleanup was requested outside of a Tokio runtime
    #[error("Auto-cleanup requires a running Tokio runtime")]
    NoRuntime,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
