//! Metrics middleware for document backends.
//!
//! This module provides a `MetricsDocumentStore` wrapper that emits a metric
//! for every backend operation (reads, writes, deletes) to a user-provided
//! sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use admin_cache::{DocumentStore, MemoryDocumentStore, MetricsDocumentStore};
//!
//! let sink = Arc::new(MyMetricsSink::new());
//! let backend = Arc::new(MemoryDocumentStore::new());
//! let store: Arc<dyn DocumentStore> = Arc::new(MetricsDocumentStore::new(backend, sink));
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::error::CacheError;
use crate::store::DocumentStore;

/// Metrics emitted by the MetricsDocumentStore wrapper.
#[derive(Debug, Clone)]
pub enum StoreMetric {
    /// Emitted on every document read.
    Read {
        collection: String,
        id: String,
        /// Whether a document was found. `false` on errors too.
        hit: bool,
        /// Whether the backend reported an error.
        failed: bool,
        latency_ms: f64,
        /// Name of the wrapped backend (from DocumentStore::name()).
        backend: String,
    },
    /// Emitted on every document write.
    Write {
        collection: String,
        id: String,
        failed: bool,
        latency_ms: f64,
        backend: String,
    },
    /// Emitted on every document delete.
    Delete {
        collection: String,
        id: String,
        failed: bool,
        latency_ms: f64,
        backend: String,
    },
}

/// Trait for receiving backend metrics.
///
/// Implement this trait to collect metrics from `MetricsDocumentStore`.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of backend operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: StoreMetric);

    /// Flush any buffered metrics.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A document store wrapper that emits metrics for all operations.
pub struct MetricsDocumentStore {
    inner: Arc<dyn DocumentStore>,
    sink: Arc<dyn MetricsSink>,
    backend_name: String,
}

impl MetricsDocumentStore {
    /// Create a new MetricsDocumentStore wrapping the given backend.
    ///
    /// # Arguments
    /// * `inner` - The backend to wrap
    /// * `sink` - The metrics sink to emit metrics to
    pub fn new(inner: Arc<dyn DocumentStore>, sink: Arc<dyn MetricsSink>) -> Self {
        let backend_name = inner.name().to_string();
        MetricsDocumentStore {
            inner,
            sink,
            backend_name,
        }
    }

    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

#[async_trait]
impl DocumentStore for MetricsDocumentStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn read_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        let start = Instant::now();
        let result = self.inner.read_document(collection, id).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(StoreMetric::Read {
            collection: collection.to_string(),
            id: id.to_string(),
            hit: matches!(result, Ok(Some(_))),
            failed: result.is_err(),
            latency_ms,
            backend: self.backend_name.clone(),
        });

        result
    }

    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        value: serde_json::Value,
        expires_at: i64,
    ) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self
            .inner
            .write_document(collection, id, value, expires_at)
            .await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(StoreMetric::Write {
            collection: collection.to_string(),
            id: id.to_string(),
            failed: result.is_err(),
            latency_ms,
            backend: self.backend_name.clone(),
        });

        result
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.delete_document(collection, id).await;
        let latency_ms = Self::elapsed_ms(start);

        self.sink.emit(StoreMetric::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
            failed: result.is_err(),
            latency_ms,
            backend: self.backend_name.clone(),
        });

        result
    }
}
