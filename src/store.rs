use async_trait::async_trait;

use crate::entry::StoredEntry;
use crate::error::CacheError;

/// The in-process tier.
///
/// Local stores are synchronous and never suspend. They are responsible for
/// treating entries that fail the validity rule as absent.
pub trait LocalStore: Send + Sync {
    /// A name for logging.
    ///
    /// # Example
    /// - "hashmap"
    /// - "moka"
    fn name(&self) -> &'static str;

    /// Return the entry if present and valid.
    ///
    /// An invalid entry is removed as a side effect and `None` is returned.
    fn get(&self, key: &str) -> Option<StoredEntry>;

    /// Unconditionally overwrite the entry for `key`.
    fn set(&self, key: &str, entry: StoredEntry);

    fn delete(&self, key: &str);

    fn clear(&self);

    /// Remove every entry failing the validity rule, returning how many were
    /// removed.
    fn purge_invalid(&self) -> usize;

    /// Number of entries currently held, valid or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence primitives of the durable, shared document backend.
///
/// Implementations must be idempotent and report transport failures as
/// errors rather than corrupting stored state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// A name for logging and metrics.
    ///
    /// # Example
    /// - "memory"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Read a document.
    ///
    /// The response must be `None` when the document does not exist.
    async fn read_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, CacheError>;

    /// Create or overwrite a document.
    ///
    /// `expires_at` (unix ms) is a hint for backends that can age documents
    /// out natively; readers never rely on it.
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        expires_at: i64,
    ) -> Result<(), CacheError>;

    /// Remove a document. Deleting a missing document is not an error.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), CacheError>;
}
