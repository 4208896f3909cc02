//! admin-cache - A two-tier cache-aside layer for administrative data snapshots
//!
//! This library provides:
//! - An in-process local tier, consulted first
//! - A durable remote tier shared by every process on the same document backend
//! - Time and schema-version based validity, applied identically by both tiers
//! - Deduplication of concurrent producer calls for the same key
//! - A background janitor sweeping expired local entries
//! - Global invalidation through a shared token
//!
//! # Example
//!
//! ```ignore
//! use admin_cache::{CacheConfig, CacheCoordinator, MemoryDocumentStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = CacheCoordinator::builder()
//!         .config(CacheConfig::from_env())
//!         .document_store(Arc::new(MemoryDocumentStore::new()))
//!         .build();
//!     let _janitor = cache.start_janitor();
//!
//!     let stats = cache
//!         .get_or_fetch("admin_stats_calculated", || async {
//!             // Compute from the source of truth
//!             Ok::<_, String>(42u64)
//!         })
//!         .await
//!         .unwrap();
//! }
//! ```

mod builder;
mod clock;
mod config;
mod coordinator;
mod entry;
mod error;
mod flight;
mod janitor;
mod remote;
mod stats;
mod store;
pub mod stores;
mod token;
mod utils;

// Re-export public API
pub use builder::{CacheCoordinatorBuilder, LocalTier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheStrategy, DEFAULT_STRATEGY};
pub use coordinator::CacheCoordinator;
pub use entry::{CacheEntry, EntryMeta, StoredEntry, ValidityPolicy};
pub use error::CacheError;
pub use janitor::{Janitor, JanitorHandle};
pub use remote::RemoteStore;
pub use stats::CacheStats;
pub use store::{DocumentStore, LocalStore};
pub use stores::document::MemoryDocumentStore;
pub use stores::memory::HashMapStore;
pub use stores::metrics::{MetricsDocumentStore, MetricsSink, StoreMetric};
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use stores::redis::{RedisDocumentStore, RedisDocumentStoreConfig};
pub use token::{GLOBAL_TOKEN_KEY, InvalidationToken, TOKEN_COLLECTION_SUFFIX};
