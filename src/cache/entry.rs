//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with access bookkeeping.

use bytes::Bytes;
use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Represents a single cache entry: an immutable payload plus the access
/// bookkeeping that drives eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Key the entry is stored under
    key: String,
    /// The stored payload
    payload: Bytes,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Timestamp of the last successful read
    last_accessed_at: DateTime<Utc>,
    /// Number of successful reads
    access_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a fresh entry that has never been read.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `payload` - The payload to store
    pub fn new(key: impl Into<String>, payload: Bytes) -> Self {
        let now = Utc::now();

        Self {
            key: key.into(),
            payload,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    /// Builds an entry with explicit bookkeeping, used to stage eviction
    /// scenarios without sleeping.
    #[cfg(test)]
    pub(crate) fn with_bookkeeping(
        key: impl Into<String>,
        payload: Bytes,
        last_accessed_at: DateTime<Utc>,
        access_count: u64,
    ) -> Self {
        Self {
            key: key.into(),
            payload,
            created_at: last_accessed_at,
            last_accessed_at,
            access_count,
        }
    }

    // == Touch ==
    /// Records a read.
    ///
    /// Returns the payload together with the updated entry; the caller writes
    /// the updated entry back while still holding the store lock.
    ///
    /// The access timestamp never moves backwards, even if the wall clock does.
    pub fn touch(&self) -> (Bytes, Self) {
        let now = Utc::now().max(self.last_accessed_at);
        let touched = Self {
            last_accessed_at: now,
            access_count: self.access_count.saturating_add(1),
            ..self.clone()
        };

        (self.payload.clone(), touched)
    }

    // == Accessors ==
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }
}
