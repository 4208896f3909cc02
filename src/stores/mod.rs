//! Store implementations for the cache library.
//!
//! Local tiers implement `LocalStore`; durable backends implement
//! `DocumentStore`.

pub mod document;
pub mod memory;
pub mod metrics;
pub mod moka;
pub mod redis;

pub use document::MemoryDocumentStore;
pub use memory::HashMapStore;
pub use metrics::{MetricsDocumentStore, MetricsSink, StoreMetric};
pub use moka::{MokaStore, MokaStoreConfig};
pub use redis::{RedisDocumentStore, RedisDocumentStoreConfig};
