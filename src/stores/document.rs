use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::CacheError;
use crate::store::DocumentStore;
use crate::utils::build_cache_key;

#[derive(Default)]
struct Shared {
    documents: RwLock<HashMap<String, serde_json::Value>>,
    readable: AtomicBool,
    writable: AtomicBool,
}

/// In-process document backend.
///
/// Clones share the same documents, so several coordinators built over clones
/// of one `MemoryDocumentStore` behave like processes sharing a backend
/// project. Reads and writes can be switched off to simulate outages.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    shared: Arc<Shared>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let shared = Shared::default();
        shared.readable.store(true, Ordering::SeqCst);
        shared.writable.store(true, Ordering::SeqCst);
        MemoryDocumentStore {
            shared: Arc::new(shared),
        }
    }

    /// Toggle both reads and writes.
    pub fn set_available(&self, available: bool) {
        self.set_readable(available);
        self.set_writable(available);
    }

    pub fn set_readable(&self, readable: bool) {
        self.shared.readable.store(readable, Ordering::SeqCst);
    }

    pub fn set_writable(&self, writable: bool) {
        self.shared.writable.store(writable, Ordering::SeqCst);
    }

    /// Raw access to a stored document, bypassing availability.
    pub fn document(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        self.shared
            .documents
            .read()
            .get(&build_cache_key(&collection, id))
            .cloned()
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.shared.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), CacheError> {
        if flag.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::unavailable(self.name()))
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        self.check(&self.shared.readable)?;
        Ok(self.document(collection, id))
    }

    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        _expires_at: i64,
    ) -> Result<(), CacheError> {
        self.check(&self.shared.writable)?;
        self.shared
            .documents
            .write()
            .insert(build_cache_key(&collection, id), value);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), CacheError> {
        self.check(&self.shared.writable)?;
        self.shared
            .documents
            .write()
            .remove(&build_cache_key(&collection, id));
        Ok(())
    }
}
