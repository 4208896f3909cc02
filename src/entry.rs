use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::utils::duration_ms;

/// A cache entry containing a value, its lifetime and the schema version it
/// was written under.
///
/// This is also the document shape persisted in the remote tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached value.
    pub data: T,

    /// Unix timestamp in milliseconds of insertion.
    pub created_at: i64,

    /// Unix timestamp in milliseconds.
    /// At and after this instant the entry is no longer valid.
    pub expires_at: i64,

    /// Schema version tag copied from the coordinator at write time.
    pub schema_version: String,
}

impl<T> CacheEntry<T> {
    /// Create a new entry living for `ttl` starting at `now_ms`.
    ///
    /// A zero `ttl` yields an entry that is already invalid.
    pub fn new(data: T, ttl: Duration, schema_version: impl Into<String>, now_ms: i64) -> Self {
        CacheEntry {
            data,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
            schema_version: schema_version.into(),
        }
    }

    /// Check if the entry has expired and should not be used.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// An entry is valid iff it has not expired and carries the current
    /// schema version.
    pub fn is_valid(&self, now_ms: i64, current_version: &str) -> bool {
        is_valid(now_ms, self.expires_at, &self.schema_version, current_version)
    }

    /// Time left before the entry expires.
    pub fn remaining(&self, now_ms: i64) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(now_ms).max(0) as u64)
    }

    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            created_at: self.created_at,
            expires_at: self.expires_at,
            schema_version: self.schema_version.clone(),
        }
    }
}

fn is_valid(now_ms: i64, expires_at: i64, version: &str, current_version: &str) -> bool {
    now_ms < expires_at && version == current_version
}

/// Lifetime metadata of an entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub created_at: i64,
    pub expires_at: i64,
    pub schema_version: String,
}

impl EntryMeta {
    pub fn is_valid(&self, now_ms: i64, current_version: &str) -> bool {
        is_valid(now_ms, self.expires_at, &self.schema_version, current_version)
    }
}

/// Type-erased entry held by local stores.
///
/// The value is stored as an `Arc<dyn Any>` so a single store can hold
/// datasets of different types; cloning only bumps a reference count.
#[derive(Clone)]
pub struct StoredEntry {
    value: Arc<dyn Any + Send + Sync>,
    meta: EntryMeta,
}

impl StoredEntry {
    pub fn from_entry<T>(entry: CacheEntry<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let meta = entry.meta();
        StoredEntry {
            value: Arc::new(entry.data),
            meta,
        }
    }

    pub fn meta(&self) -> &EntryMeta {
        &self.meta
    }

    /// Convert back to a typed entry.
    ///
    /// Returns `None` when the stored value is not a `T`.
    pub fn into_typed<T>(self) -> Option<CacheEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let data = self.value.downcast_ref::<T>()?.clone();
        Some(CacheEntry {
            data,
            created_at: self.meta.created_at,
            expires_at: self.meta.expires_at,
            schema_version: self.meta.schema_version,
        })
    }
}

impl fmt::Debug for StoredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredEntry")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// The validity rule shared by both tiers: `now < expires_at` and the schema
/// version equals the configured one.
#[derive(Clone)]
pub struct ValidityPolicy {
    clock: Arc<dyn Clock>,
    schema_version: Arc<str>,
}

impl ValidityPolicy {
    pub fn new(clock: Arc<dyn Clock>, schema_version: &str) -> Self {
        ValidityPolicy {
            clock,
            schema_version: Arc::from(schema_version),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn is_valid(&self, meta: &EntryMeta) -> bool {
        meta.is_valid(self.now_ms(), &self.schema_version)
    }

    pub fn accepts<T>(&self, entry: &CacheEntry<T>) -> bool {
        entry.is_valid(self.now_ms(), &self.schema_version)
    }

    /// Stamp a fresh entry with the current time and schema version.
    pub fn stamp<T>(&self, data: T, ttl: Duration) -> CacheEntry<T> {
        CacheEntry::new(data, ttl, self.schema_version.as_ref(), self.now_ms())
    }
}

impl fmt::Debug for ValidityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidityPolicy")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}
