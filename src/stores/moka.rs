use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;

use crate::entry::{StoredEntry, ValidityPolicy};
use crate::store::LocalStore;

/// Configuration for MokaStore.
#[derive(Debug, Clone, Default)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    /// `None` leaves the store unbounded so entries only leave by time or
    /// version.
    pub max_capacity: Option<u64>,
}

/// Concurrent local store using Moka.
///
/// MokaStore provides:
/// - Lock-free concurrent access for reads and writes
/// - Excellent performance under high concurrency (>8 threads)
///
/// Validity is still decided by the shared `ValidityPolicy`; Moka's own
/// time-based expiration is not used.
pub struct MokaStore {
    cache: Cache<String, StoredEntry>,
    policy: ValidityPolicy,
}

impl MokaStore {
    /// Create a new MokaStore with the given configuration.
    ///
    /// # Example
    /// ```ignore
    /// let store = MokaStore::new(MokaStoreConfig::default(), policy);
    /// ```
    pub fn new(config: MokaStoreConfig, policy: ValidityPolicy) -> Self {
        let mut builder = Cache::builder();

        if let Some(max_capacity) = config.max_capacity {
            builder = builder.max_capacity(max_capacity);
        }

        MokaStore {
            cache: builder.build(),
            policy,
        }
    }

    /// Remove `key` if its current entry is invalid. The check and the removal
    /// happen atomically, so a valid entry set concurrently is kept.
    fn remove_if_invalid(&self, key: &str) -> bool {
        let result = self.cache.entry_by_ref(key).and_compute_with(|current| match current {
            Some(current) if !self.policy.is_valid(current.value().meta()) => Op::Remove,
            _ => Op::Nop,
        });
        matches!(result, CompResult::Removed(_))
    }
}

impl LocalStore for MokaStore {
    fn name(&self) -> &'static str {
        "moka"
    }

    fn get(&self, key: &str) -> Option<StoredEntry> {
        let entry = self.cache.get(key)?;

        if !self.policy.is_valid(entry.meta()) {
            self.remove_if_invalid(key);
            return None;
        }

        Some(entry)
    }

    fn set(&self, key: &str, entry: StoredEntry) {
        self.cache.insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn purge_invalid(&self) -> usize {
        let candidates: Vec<_> = self
            .cache
            .iter()
            .filter(|(_, entry)| !self.policy.is_valid(entry.meta()))
            .map(|(key, _)| key)
            .collect();

        let purged = candidates
            .iter()
            .filter(|key| self.remove_if_invalid(key.as_str()))
            .count();
        self.cache.run_pending_tasks();

        purged
    }

    fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }
}
