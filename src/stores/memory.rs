use parking_lot::RwLock;
use std::collections::HashMap;

use crate::entry::{StoredEntry, ValidityPolicy};
use crate::store::LocalStore;

/// Thread-safe in-memory local store using HashMap with RwLock.
///
/// This is a simple store suitable for:
/// - A bounded set of dataset keys (admin snapshots, statistics)
/// - Applications prioritizing simplicity over raw throughput
///
/// Entries are only ever removed by time or version; there is no capacity
/// bound. For high-concurrency scenarios, consider using `MokaStore` instead.
pub struct HashMapStore {
    state: RwLock<HashMap<String, StoredEntry>>,
    policy: ValidityPolicy,
}

impl HashMapStore {
    /// Create a new HashMapStore checking entries against `policy`.
    pub fn new(policy: ValidityPolicy) -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
            policy,
        }
    }
}

impl LocalStore for HashMapStore {
    fn name(&self) -> &'static str {
        "hashmap"
    }

    fn get(&self, key: &str) -> Option<StoredEntry> {
        {
            let state = self.state.read();
            let stored = state.get(key)?;
            if self.policy.is_valid(stored.meta()) {
                return Some(stored.clone());
            }
        }

        // Entry is invalid, remove it unless it was replaced in the meantime
        let mut state = self.state.write();
        if let Some(stored) = state.get(key)
            && !self.policy.is_valid(stored.meta())
        {
            state.remove(key);
        }
        None
    }

    fn set(&self, key: &str, entry: StoredEntry) {
        self.state.write().insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.state.write().remove(key);
    }

    fn clear(&self) {
        self.state.write().clear();
    }

    fn purge_invalid(&self) -> usize {
        let mut state = self.state.write();
        let before = state.len();
        state.retain(|_, v| self.policy.is_valid(v.meta()));
        before - state.len()
    }

    fn len(&self) -> usize {
        self.state.read().len()
    }
}
