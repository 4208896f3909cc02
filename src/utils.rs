//! Shared utilities for the cache library.

use std::fmt::Display;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Build a composite document key from collection and key.
///
/// Format: `{collection}::{key}`
pub fn build_cache_key<N: Display>(collection: &N, key: &str) -> String {
    format!("{}::{}", collection, key)
}

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Convert a TTL to milliseconds, saturating at `i64::MAX`.
pub fn duration_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
