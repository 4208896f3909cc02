use serde::{Deserialize, Serialize};

use crate::entry::CacheEntry;

/// Key under which the global invalidation token is stored.
pub const GLOBAL_TOKEN_KEY: &str = "__global_invalidation__";

/// Suffix of the collection holding the token, kept apart from the entries'
/// collection so no caller key can reach it.
pub const TOKEN_COLLECTION_SUFFIX: &str = ":invalidation";

/// Marker written by `invalidate_all`.
///
/// Any remote entry created at or before `issued_at` is treated as absent for
/// as long as the token itself is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationToken {
    /// Timestamp-derived version, strictly increasing across bumps.
    pub version: String,
    /// Unix timestamp in milliseconds.
    pub issued_at: i64,
}

impl InvalidationToken {
    /// Issue the token following `previous`.
    ///
    /// `issued_at` never goes backwards, even if the clock does.
    pub fn next(now_ms: i64, previous: Option<&InvalidationToken>) -> Self {
        let issued_at = match previous {
            Some(prev) => now_ms.max(prev.issued_at.saturating_add(1)),
            None => now_ms,
        };
        InvalidationToken {
            version: format!("g{:013}", issued_at),
            issued_at,
        }
    }

    /// Whether `entry` was written no later than the millisecond this token
    /// was issued in.
    pub fn supersedes<T>(&self, entry: &CacheEntry<T>) -> bool {
        entry.created_at <= self.issued_at
    }
}
