//! Configuration Module
//!
//! Handles loading and validating cache configuration.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CleanupPolicy;
use crate::error::{CacheError, Result};

// == Defaults ==
/// Default maximum number of entries
pub const DEFAULT_CAPACITY: usize = 50;

/// Default auto-cleanup interval (disabled)
pub const DEFAULT_AUTO_CLEANUP_INTERVAL: Duration = Duration::ZERO;

// == Cache Config ==
/// Cache configuration parameters.
///
/// A config is an immutable value: the manager swaps the whole config at
/// once and never edits one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of entries at which the cache counts as full
    pub capacity: usize,
    /// Strategy applied when the cache is full
    pub policy: CleanupPolicy,
    /// Period of the background cleanup pass, zero disables it
    #[serde(with = "duration_secs")]
    pub auto_cleanup_interval: Duration,
}

impl CacheConfig {
    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the cleanup policy.
    pub fn with_policy(mut self, policy: CleanupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the auto-cleanup interval. `Duration::ZERO` disables it.
    pub fn with_auto_cleanup_interval(mut self, interval: Duration) -> Self {
        self.auto_cleanup_interval = interval;
        self
    }

    /// Whether a background cleanup schedule should be armed.
    pub fn auto_cleanup_enabled(&self) -> bool {
        !self.auto_cleanup_interval.is_zero()
    }

    // == Validate ==
    /// Checks that the config can be applied.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "Capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 50)
    /// - `CACHE_CLEANUP_POLICY` - `clear_all`, `lru`, `below_frequency:<n>`
    ///   or `older_than:<secs>` (default: `lru`)
    /// - `CACHE_AUTO_CLEANUP_SECS` - Cleanup period in seconds, fractional
    ///   values allowed, 0 disables (default: 0)
    ///
    /// Unset variables fall back to defaults; malformed ones are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`] with a caller-supplied variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("CACHE_CAPACITY") {
            config.capacity = raw.trim().parse().map_err(|_| {
                CacheError::InvalidConfig(format!("Invalid CACHE_CAPACITY: {}", raw))
            })?;
        }

        if let Some(raw) = lookup("CACHE_CLEANUP_POLICY") {
            config.policy = raw.parse()?;
        }

        if let Some(raw) = lookup("CACHE_AUTO_CLEANUP_SECS") {
            config.auto_cleanup_interval = parse_secs(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: CleanupPolicy::default(),
            auto_cleanup_interval: DEFAULT_AUTO_CLEANUP_INTERVAL,
        }
    }
}

// == Duration Helpers ==
/// Parses a non-negative, finite number of seconds.
pub(crate) fn parse_secs(raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CacheError::InvalidConfig(format!("Invalid duration: {}", raw)))?;
    secs_to_duration(secs)
}

fn secs_to_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        CacheError::InvalidConfig(format!(
            "Duration must be a finite, non-negative number of seconds, got {}",
            secs
        ))
    })
}

/// Serializes a `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        super::secs_to_duration(secs).map_err(de::Error::custom)
    }
}
