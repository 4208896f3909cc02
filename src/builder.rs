//! Builder API for creating coordinator instances.
//!
//! This module provides a convenient way to wire the clock, the local tier and
//! the document backend together under one configuration.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::coordinator::CacheCoordinator;
use crate::entry::ValidityPolicy;
use crate::remote::RemoteStore;
use crate::store::{DocumentStore, LocalStore};
use crate::stores::document::MemoryDocumentStore;
use crate::stores::memory::HashMapStore;
use crate::stores::moka::{MokaStore, MokaStoreConfig};

/// Which local store implementation to use.
#[derive(Debug, Clone, Default)]
pub enum LocalTier {
    /// `HashMapStore`
    #[default]
    HashMap,
    /// `MokaStore`
    Moka(MokaStoreConfig),
}

/// Builder for `CacheCoordinator`.
///
/// # Example
///
/// ```ignore
/// use admin_cache::{CacheConfig, CacheCoordinator, LocalTier, RedisDocumentStore};
/// use std::sync::Arc;
///
/// let backend = Arc::new(RedisDocumentStore::new(redis_config).await?);
///
/// let cache = CacheCoordinator::builder()
///     .config(CacheConfig::from_env())
///     .local_tier(LocalTier::Moka(Default::default()))
///     .document_store(backend)
///     .build();
/// ```
pub struct CacheCoordinatorBuilder {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    local_tier: LocalTier,
    backend: Option<Arc<dyn DocumentStore>>,
}

impl CacheCoordinatorBuilder {
    /// Create a new builder with the default configuration, the system clock,
    /// a `HashMapStore` and an in-process document backend.
    pub fn new() -> Self {
        CacheCoordinatorBuilder {
            config: CacheConfig::default(),
            clock: Arc::new(SystemClock),
            local_tier: LocalTier::default(),
            backend: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn local_tier(mut self, local_tier: LocalTier) -> Self {
        self.local_tier = local_tier;
        self
    }

    pub fn document_store(mut self, backend: Arc<dyn DocumentStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the coordinator.
    pub fn build(self) -> CacheCoordinator {
        let policy = ValidityPolicy::new(self.clock, &self.config.schema_version);

        let local: Arc<dyn LocalStore> = match self.local_tier {
            LocalTier::HashMap => Arc::new(HashMapStore::new(policy.clone())),
            LocalTier::Moka(moka_config) => Arc::new(MokaStore::new(moka_config, policy.clone())),
        };

        let backend: Arc<dyn DocumentStore> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(MemoryDocumentStore::new()),
        };
        let remote = RemoteStore::new(backend, &self.config.collection, policy.clone());

        CacheCoordinator::from_parts(self.config, policy, local, remote)
    }
}

impl Default for CacheCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
