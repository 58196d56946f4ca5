//! Cleanup Policy Module
//!
//! The closed set of eviction strategies and the pure selection logic that
//! decides which entries a cleanup pass removes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::config::{duration_secs, parse_secs};
use crate::error::CacheError;

// == Cleanup Policy ==
/// Strategy applied when the cache is full.
///
/// Parsed from strings of the form `clear_all`, `lru`,
/// `below_frequency:<count>` and `older_than:<seconds>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove every entry
    ClearAll,
    /// Remove every entry read fewer than `threshold` times
    EvictBelowFrequency { threshold: u64 },
    /// Remove every entry not read within `max_age`
    EvictOlderThan {
        #[serde(with = "duration_secs")]
        max_age: Duration,
    },
    /// Remove the single entry with the oldest last access
    #[default]
    EvictLeastRecentlyUsed,
}

impl CleanupPolicy {
    // == Select ==
    /// Returns the keys this policy would remove from `entries` at `now`.
    ///
    /// For [`CleanupPolicy::EvictLeastRecentlyUsed`] ties on the access
    /// timestamp go to whichever entry the map yields first, so the choice
    /// between tied entries is unspecified.
    pub fn select(&self, entries: &HashMap<String, CacheEntry>, now: DateTime<Utc>) -> Vec<String> {
        match *self {
            CleanupPolicy::ClearAll => entries.keys().cloned().collect(),
            CleanupPolicy::EvictBelowFrequency { threshold } => entries
                .iter()
                .filter(|(_, entry)| entry.access_count() < threshold)
                .map(|(key, _)| key.clone())
                .collect(),
            CleanupPolicy::EvictOlderThan { max_age } => {
                // A horizon before the representable range means nothing is stale
                let Some(horizon) = TimeDelta::from_std(max_age)
                    .ok()
                    .and_then(|age| now.checked_sub_signed(age))
                else {
                    return Vec::new();
                };

                entries
                    .iter()
                    .filter(|(_, entry)| entry.last_accessed_at() < horizon)
                    .map(|(key, _)| key.clone())
                    .collect()
            }
            CleanupPolicy::EvictLeastRecentlyUsed => entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed_at())
                .map(|(key, _)| key.clone())
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupPolicy::ClearAll => write!(f, "clear_all"),
            CleanupPolicy::EvictBelowFrequency { threshold } => {
                write!(f, "below_frequency:{}", threshold)
            }
            CleanupPolicy::EvictOlderThan { max_age } => {
                write!(f, "older_than:{}", max_age.as_secs_f64())
            }
            CleanupPolicy::EvictLeastRecentlyUsed => write!(f, "lru"),
        }
    }
}

impl FromStr for CleanupPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (s.as_str(), None),
        };

        match (name, arg) {
            ("clear_all", None) => Ok(CleanupPolicy::ClearAll),
            ("lru" | "least_recently_used", None) => Ok(CleanupPolicy::EvictLeastRecentlyUsed),
            ("below_frequency", Some(arg)) => {
                let threshold = arg.parse().map_err(|_| {
                    CacheError::InvalidConfig(format!("Invalid frequency threshold: {}", arg))
                })?;
                Ok(CleanupPolicy::EvictBelowFrequency { threshold })
            }
            ("older_than", Some(arg)) => Ok(CleanupPolicy::EvictOlderThan {
                max_age: parse_secs(arg)?,
            }),
            _ => Err(CacheError::InvalidConfig(format!(
                "Unknown cleanup policy: {}",
                s
            ))),
        }
    }
}
