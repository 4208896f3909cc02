use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::entry::{CacheEntry, ValidityPolicy};
use crate::error::CacheError;
use crate::store::DocumentStore;
use crate::token::{GLOBAL_TOKEN_KEY, InvalidationToken, TOKEN_COLLECTION_SUFFIX};

/// The durable, shared tier: one document per key in a single collection of
/// the document backend. The invalidation token lives in a sibling
/// collection (`{collection}:invalidation`).
///
/// Reads never fail: a missing, undecodable, invalid or superseded document
/// and a backend error all read as a miss.
#[derive(Clone)]
pub struct RemoteStore {
    backend: Arc<dyn DocumentStore>,
    collection: String,
    token_collection: String,
    policy: ValidityPolicy,
}

impl RemoteStore {
    pub fn new(backend: Arc<dyn DocumentStore>, collection: &str, policy: ValidityPolicy) -> Self {
        RemoteStore {
            backend,
            collection: collection.to_string(),
            token_collection: format!("{}{}", collection, TOKEN_COLLECTION_SUFFIX),
            policy,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Return the entry if it exists, decodes as `CacheEntry<T>`, is valid and
    /// was written after the current invalidation token.
    pub async fn get<T>(&self, key: &str) -> Option<CacheEntry<T>>
    where
        T: DeserializeOwned,
    {
        let (entry, token) = futures::join!(
            self.read_entry::<T>(&self.collection, key),
            self.current_token()
        );
        let entry = entry?;

        if let Some(token) = token
            && token.supersedes(&entry)
        {
            tracing::debug!(
                "Remote entry superseded by invalidation token: collection={}, key={}, token={}",
                self.collection,
                key,
                token.version
            );
            return None;
        }

        Some(entry)
    }

    /// The invalidation token currently in force, if any.
    pub async fn current_token(&self) -> Option<InvalidationToken> {
        self.read_entry::<InvalidationToken>(&self.token_collection, GLOBAL_TOKEN_KEY)
            .await
            .map(|entry| entry.data)
    }

    async fn read_entry<T>(&self, collection: &str, key: &str) -> Option<CacheEntry<T>>
    where
        T: DeserializeOwned,
    {
        let document = match self.backend.read_document(collection, key).await {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    "Remote read failed, treating as miss: backend={}, collection={}, key={}, error={}",
                    self.backend.name(),
                    collection,
                    key,
                    e
                );
                return None;
            }
        };

        // Legacy tombstones are empty objects and land here too
        let entry: CacheEntry<T> = match serde_json::from_value(document) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(
                    "Discarding undecodable remote document: collection={}, key={}, error={}",
                    collection,
                    key,
                    e
                );
                return None;
            }
        };

        if !self.policy.accepts(&entry) {
            tracing::debug!(
                "Discarding invalid remote entry: collection={}, key={}, schema_version={}",
                collection,
                key,
                entry.schema_version
            );
            return None;
        }

        Some(entry)
    }

    /// Write `entry` under `key`, overwriting any previous document.
    pub async fn set<T>(&self, key: &str, entry: &CacheEntry<T>) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        self.write_entry(&self.collection, key, entry).await
    }

    async fn write_entry<T>(
        &self,
        collection: &str,
        key: &str,
        entry: &CacheEntry<T>,
    ) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let document = serde_json::to_value(entry)?;
        self.backend
            .write_document(collection, key, document, entry.expires_at)
            .await
    }

    /// Delete the document for `key`. Returns whether the backend accepted
    /// the delete; failures are logged.
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete_document(&self.collection, key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Remote delete failed: backend={}, collection={}, key={}, error={}",
                    self.backend.name(),
                    self.collection,
                    key,
                    e
                );
                false
            }
        }
    }

    /// Write a new invalidation token living for `ttl`.
    pub async fn bump_token(&self, ttl: Duration) -> Result<InvalidationToken, CacheError> {
        let previous = self.current_token().await;
        let token = InvalidationToken::next(self.policy.now_ms(), previous.as_ref());

        let entry = CacheEntry::new(
            token.clone(),
            ttl,
            self.policy.schema_version(),
            token.issued_at,
        );
        self.write_entry(&self.token_collection, GLOBAL_TOKEN_KEY, &entry)
            .await?;

        Ok(token)
    }
}
