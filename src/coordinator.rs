use futures::FutureExt;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::builder::CacheCoordinatorBuilder;
use crate::config::{CacheConfig, CacheStrategy};
use crate::entry::{StoredEntry, ValidityPolicy};
use crate::error::CacheError;
use crate::flight::{FlightGuard, InFlight, Joined};
use crate::janitor::{Janitor, JanitorHandle};
use crate::remote::RemoteStore;
use crate::stats::{CacheStats, StatsRecorder};
use crate::store::LocalStore;
use crate::token::InvalidationToken;

/// Per-call caching options.
#[derive(Debug, Clone, Copy)]
struct FetchOptions {
    ttl: Duration,
    max_size_bytes: Option<usize>,
}

impl From<&CacheStrategy> for FetchOptions {
    fn from(strategy: &CacheStrategy) -> Self {
        FetchOptions {
            ttl: strategy.ttl,
            max_size_bytes: strategy.max_size_bytes,
        }
    }
}

struct Inner {
    local: Arc<dyn LocalStore>,
    remote: RemoteStore,
    policy: ValidityPolicy,
    config: CacheConfig,
    in_flight: Arc<InFlight>,
    stats: StatsRecorder,
}

/// Cache-aside coordinator over a local and a remote tier.
///
/// Lookups go local, then remote, then to the caller's producer. The
/// coordinator is the only writer of either tier. Cloning is cheap and clones
/// share all state, including in-flight producers.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

impl CacheCoordinator {
    pub fn builder() -> CacheCoordinatorBuilder {
        CacheCoordinatorBuilder::new()
    }

    /// Assemble a coordinator from its parts.
    ///
    /// `policy` must be the same policy the local store was built with.
    pub fn from_parts(
        config: CacheConfig,
        policy: ValidityPolicy,
        local: Arc<dyn LocalStore>,
        remote: RemoteStore,
    ) -> Self {
        CacheCoordinator {
            inner: Arc::new(Inner {
                local,
                remote,
                policy,
                config,
                in_flight: Arc::new(InFlight::default()),
                stats: StatsRecorder::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get the cached value for `key` or produce it, caching it for the
    /// default TTL.
    ///
    /// # Example
    /// ```ignore
    /// let users = cache.get_or_fetch("admin_users_list", || async {
    ///     db.list_users().await
    /// }).await?;
    /// ```
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, producer: F) -> Result<T, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ttl = self.inner.config.default_ttl;
        self.get_or_fetch_with_ttl(key, ttl, producer).await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) with an explicit TTL.
    ///
    /// A zero TTL still returns the produced value, but the entry is invalid
    /// on the next read.
    pub async fn get_or_fetch_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let opts = FetchOptions {
            ttl,
            max_size_bytes: None,
        };
        self.fetch(key, opts, producer).await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) with the TTL and size limit
    /// of a named strategy. Unknown names use the default strategy.
    pub async fn get_or_fetch_with_strategy<T, E, F, Fut>(
        &self,
        key: &str,
        strategy: &str,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let opts = FetchOptions::from(&self.inner.config.strategy(strategy));
        self.fetch(key, opts, producer).await
    }

    async fn fetch<T, E, F, Fut>(&self, key: &str, opts: FetchOptions, producer: F) -> Result<T, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            return Ok(value);
        }

        self.inner.stats.miss();
        tracing::debug!("Cache miss: key={}", key);

        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        let joined = self.inner.in_flight.join_or_start(key, move |flight| {
            Inner::run_producer(inner, owned_key, flight, opts, producer).boxed()
        });

        match joined {
            Joined::Leader(flight) => flight.await,
            Joined::Follower(flight) => {
                self.inner.stats.coalesced();
                tracing::debug!("Awaiting in-flight producer: key={}", key);
                flight.await
            }
        }
    }

    /// Local then remote lookup. A remote hit is copied into the local tier
    /// with its original expiry.
    async fn lookup<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        let inner = &self.inner;

        if let Some(entry) = inner.local.get(key).and_then(|e| e.into_typed::<T>()) {
            inner.stats.local_hit();
            tracing::debug!("Cache hit: tier={}, key={}", inner.local.name(), key);
            return Some(entry.data);
        }

        let entry = inner.remote.get::<T>(key).await?;
        inner.stats.remote_hit();
        tracing::debug!(
            "Cache hit: tier={}, key={}",
            inner.remote.backend_name(),
            key
        );

        let value = entry.data.clone();
        inner.local.set(key, StoredEntry::from_entry(entry));
        Some(value)
    }

    /// Return the cached value for `key` without ever producing it.
    pub async fn peek<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        self.lookup::<T>(key).await
    }

    /// The subset of `keys` with no valid entry in either tier, whatever the
    /// cached type.
    pub async fn missing_keys(&self, keys: &[&str]) -> Vec<String> {
        let mut missing = Vec::new();
        for key in keys {
            if self.inner.local.get(key).is_some() {
                continue;
            }
            if self.inner.remote.get::<serde_json::Value>(key).await.is_none() {
                tracing::debug!("Key not warm: key={}", key);
                missing.push(key.to_string());
            }
        }
        missing
    }

    /// Drop `key` from the remote tier and from this process' local tier.
    ///
    /// Local copies held by other processes expire on their own TTL.
    pub async fn invalidate(&self, key: &str) {
        self.inner.stats.invalidation();
        self.inner.local.delete(key);
        if self.inner.remote.delete(key).await {
            tracing::debug!("Cache invalidated: key={}", key);
        }
    }

    /// Invalidate every entry written so far.
    ///
    /// Clears this process' local tier and bumps the global invalidation
    /// token; remote entries created before the token are ignored by every
    /// coordinator sharing the backend. Other processes' local copies expire
    /// on their own TTL.
    pub async fn invalidate_all(&self) -> Result<InvalidationToken, CacheError> {
        self.inner.stats.invalidation();
        self.inner.local.clear();

        let token = self
            .inner
            .remote
            .bump_token(self.inner.config.token_ttl)
            .await?;
        tracing::info!(
            "Global cache invalidation: collection={}, token={}",
            self.inner.remote.collection(),
            token.version
        );
        Ok(token)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .stats
            .snapshot(self.inner.local.len(), self.inner.in_flight.len())
    }

    /// A janitor over this coordinator's local tier, not yet started.
    pub fn janitor(&self) -> Janitor {
        Janitor::new(
            Arc::clone(&self.inner.local),
            self.inner.config.janitor_period,
        )
    }

    /// Start sweeping the local tier every `janitor_period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_janitor(&self) -> JanitorHandle {
        self.janitor().spawn()
    }

    pub fn policy(&self) -> &ValidityPolicy {
        &self.inner.policy
    }
}

impl Inner {
    /// Body of a flight: run the producer and populate both tiers on success.
    /// The flight's slot is released when `flight` drops, on completion or
    /// when every caller has gone away.
    async fn run_producer<T, E, F, Fut>(
        inner: Arc<Inner>,
        key: String,
        flight: FlightGuard<T, E>,
        opts: FetchOptions,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        inner.stats.producer_run();
        let result = producer().await;

        match &result {
            Ok(value) => inner.populate(&key, value, opts).await,
            Err(_) => {
                inner.stats.producer_error();
                tracing::debug!("Producer failed, nothing cached: key={}", key);
            }
        }

        drop(flight);
        result
    }

    /// Write remote first; the local tier is only populated once the remote
    /// write succeeded.
    async fn populate<T>(&self, key: &str, value: &T, opts: FetchOptions)
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        // Entries never outlive the invalidation token
        let ttl = opts.ttl.min(self.config.token_ttl);
        let entry = self.policy.stamp(value.clone(), ttl);

        if let Some(limit) = opts.max_size_bytes {
            match serde_json::to_vec(&entry.data) {
                Ok(bytes) if bytes.len() > limit => {
                    self.stats.oversized_skip();
                    tracing::warn!(
                        "Value too large to cache: key={}, size={}, limit={}",
                        key,
                        bytes.len(),
                        limit
                    );
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Value not serializable, not cached: key={}, error={}", key, e);
                    return;
                }
            }
        }

        if let Err(e) = self.remote.set(key, &entry).await {
            self.stats.remote_write_failure();
            tracing::warn!(
                "Remote write failed, value not cached: backend={}, key={}, error={}",
                self.remote.backend_name(),
                key,
                e
            );
            return;
        }

        self.local.set(key, StoredEntry::from_entry(entry));
        tracing::debug!("Cached value: key={}, ttl={:?}", key, ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::stores::document::MemoryDocumentStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator() -> (CacheCoordinator, MemoryDocumentStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let backend = MemoryDocumentStore::new();
        let cache = CacheCoordinator::builder()
            .clock(clock.clone())
            .document_store(Arc::new(backend.clone()))
            .build();
        (cache, backend, clock)
    }

    #[tokio::test]
    async fn test_miss_then_local_hit() {
        let (cache, backend, _clock) = coordinator();
        let call_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let count = call_count.clone();
            let result: Result<u64, String> = cache
                .get_or_fetch("admin_stats_calculated", move || async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await;
            assert_eq!(result, Ok(42));
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(backend.document("adminCache", "admin_stats_calculated").is_some());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.local_hits, 1);
        assert_eq!(stats.producer_runs, 1);
        assert_eq!(stats.local_entries, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_producer_error_is_returned_and_not_cached() {
        let (cache, backend, _clock) = coordinator();

        let result: Result<u64, String> = cache
            .get_or_fetch("stats", || async { Err("backend down".to_string()) })
            .await;

        assert_eq!(result, Err("backend down".to_string()));
        assert!(backend.is_empty());
        assert_eq!(cache.stats().local_entries, 0);
        assert_eq!(cache.stats().producer_errors, 1);
    }

    #[tokio::test]
    async fn test_oversized_value_is_returned_but_not_cached() {
        let (cache, backend, _clock) = coordinator();
        let config_limit = cache.config().strategy("subscriptions").max_size_bytes;
        assert_eq!(config_limit, Some(256 * 1024));

        let big = "x".repeat(300 * 1024);
        let expected = big.clone();
        let result: Result<String, String> = cache
            .get_or_fetch_with_strategy("admin_subscriptions", "subscriptions", move || async move {
                Ok(big)
            })
            .await;

        assert_eq!(result, Ok(expected));
        assert!(backend.is_empty());
        assert_eq!(cache.stats().oversized_skips, 1);
    }

    #[tokio::test]
    async fn test_strategy_ttl_applies() {
        let (cache, _backend, clock) = coordinator();
        let call_count = Arc::new(AtomicUsize::new(0));

        let fetch = |count: Arc<AtomicUsize>| {
            let cache = cache.clone();
            async move {
                cache
                    .get_or_fetch_with_strategy("admin_users_list", "users", move || async move {
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(vec!["alice".to_string()])
                    })
                    .await
            }
        };

        fetch(call_count.clone()).await.unwrap();
        clock.advance(Duration::from_secs(9 * 60));
        fetch(call_count.clone()).await.unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // users strategy lives 10 minutes
        clock.advance(Duration::from_secs(60));
        fetch(call_count.clone()).await.unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_peek_and_missing_keys() {
        let (cache, _backend, _clock) = coordinator();

        assert_eq!(cache.peek::<u8>("stats").await, None);

        let _: Result<u8, String> = cache.get_or_fetch("stats", || async { Ok(3) }).await;

        assert_eq!(cache.peek::<u8>("stats").await, Some(3));
        assert_eq!(
            cache.missing_keys(&["stats", "admin_users_list"]).await,
            vec!["admin_users_list".to_string()]
        );
    }

    #[tokio::test]
    async fn test_entry_ttl_is_capped_by_token_ttl() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let backend = MemoryDocumentStore::new();
        let cache = CacheCoordinator::builder()
            .config(CacheConfig {
                token_ttl: Duration::from_secs(3600),
                ..CacheConfig::default()
            })
            .clock(clock.clone())
            .document_store(Arc::new(backend.clone()))
            .build();

        let _: Result<u8, String> = cache
            .get_or_fetch_with_ttl("analytics", Duration::from_secs(48 * 3600), || async {
                Ok(1)
            })
            .await;

        let doc = backend.document("adminCache", "analytics").unwrap();
        assert_eq!(doc["expiresAt"], 1_700_000_000_000i64 + 3_600_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_does_not_leave_a_flight_behind() {
        let (cache, _backend, _clock) = coordinator();

        let slow = cache.get_or_fetch("slow", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<u8, String>(1)
        });
        assert!(
            tokio::time::timeout(Duration::from_millis(10), slow)
                .await
                .is_err()
        );
        assert_eq!(cache.stats().in_flight, 0);

        let fresh: Result<u8, String> = cache.get_or_fetch("slow", || async { Ok(2) }).await;
        assert_eq!(fresh, Ok(2));
        assert_eq!(cache.stats().producer_runs, 2);
    }

    #[tokio::test]
    async fn test_type_mismatch_under_same_key_is_a_miss() {
        let (cache, _backend, _clock) = coordinator();

        let _: Result<u8, String> = cache.get_or_fetch("k", || async { Ok(3) }).await;
        let other: Result<String, String> = cache
            .get_or_fetch("k", || async { Ok("three".to_string()) })
            .await;

        assert_eq!(other, Ok("three".to_string()));
    }
}
