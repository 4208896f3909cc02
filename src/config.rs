//! Cache configuration

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Name of the fallback strategy.
pub const DEFAULT_STRATEGY: &str = "default";

/// A named caching profile for one kind of dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStrategy {
    pub name: String,
    /// Lifetime of entries written under this strategy.
    pub ttl: Duration,
    /// Values whose JSON encoding is larger than this are returned to the
    /// caller but not cached. `None` disables the check.
    pub max_size_bytes: Option<usize>,
}

impl CacheStrategy {
    pub fn new(name: &str, ttl: Duration, max_size_bytes: Option<usize>) -> Self {
        CacheStrategy {
            name: name.to_string(),
            ttl,
            max_size_bytes,
        }
    }
}

/// Configuration for the cache coordinator
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used when a caller does not give one
    pub default_ttl: Duration,
    /// Interval between janitor sweeps of the local tier
    pub janitor_period: Duration,
    /// Lifetime of the global invalidation token, and the upper bound on
    /// every entry TTL
    pub token_ttl: Duration,
    /// Entries written under any other schema version are ignored
    pub schema_version: String,
    /// Document collection holding remote entries
    pub collection: String,
    /// Named strategies for `get_or_fetch_with_strategy`
    pub strategies: HashMap<String, CacheStrategy>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let default_ttl = Duration::from_secs(30 * 60);
        Self {
            default_ttl,
            janitor_period: Duration::from_secs(5 * 60), // 5 minutes
            token_ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            schema_version: "v2.0.0".to_string(),
            collection: "adminCache".to_string(),
            strategies: default_strategies(default_ttl),
        }
    }
}

fn default_strategies(default_ttl: Duration) -> HashMap<String, CacheStrategy> {
    const KB: usize = 1024;
    let minutes = |m: u64| Duration::from_secs(m * 60);

    [
        CacheStrategy::new("users", minutes(10), Some(1024 * KB)),
        CacheStrategy::new("stats", minutes(15), Some(512 * KB)),
        CacheStrategy::new("analytics", minutes(60), Some(2048 * KB)),
        CacheStrategy::new("subscriptions", minutes(15), Some(256 * KB)),
        CacheStrategy::new(DEFAULT_STRATEGY, default_ttl, Some(512 * KB)),
    ]
    .into_iter()
    .map(|s| (s.name.clone(), s))
    .collect()
}

impl CacheConfig {
    /// Load the configuration from `ADMIN_CACHE_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    ///
    /// - `ADMIN_CACHE_DEFAULT_TTL_SECS`
    /// - `ADMIN_CACHE_JANITOR_PERIOD_SECS`
    /// - `ADMIN_CACHE_TOKEN_TTL_SECS`
    /// - `ADMIN_CACHE_SCHEMA_VERSION`
    /// - `ADMIN_CACHE_COLLECTION`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "ADMIN_CACHE_DEFAULT_TTL_SECS") {
            config.default_ttl = Duration::from_secs(secs);
            if let Some(default) = config.strategies.get_mut(DEFAULT_STRATEGY) {
                default.ttl = config.default_ttl;
            }
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ADMIN_CACHE_JANITOR_PERIOD_SECS") {
            config.janitor_period = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ADMIN_CACHE_TOKEN_TTL_SECS") {
            config.token_ttl = Duration::from_secs(secs);
        }
        if let Some(version) = lookup("ADMIN_CACHE_SCHEMA_VERSION").filter(|v| !v.is_empty()) {
            config.schema_version = version;
        }
        if let Some(collection) = lookup("ADMIN_CACHE_COLLECTION").filter(|v| !v.is_empty()) {
            config.collection = collection;
        }

        config
    }

    /// Look up a strategy, falling back to the default strategy and then to
    /// the default TTL without a size limit.
    pub fn strategy(&self, name: &str) -> CacheStrategy {
        self.strategies
            .get(name)
            .or_else(|| self.strategies.get(DEFAULT_STRATEGY))
            .cloned()
            .unwrap_or_else(|| CacheStrategy::new(DEFAULT_STRATEGY, self.default_ttl, None))
    }

    /// Register or replace a strategy.
    pub fn with_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategies.insert(strategy.name.clone(), strategy);
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(1800));
        assert_eq!(config.janitor_period, Duration::from_secs(300));
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.collection, "adminCache");
        assert_eq!(config.strategy("users").ttl, Duration::from_secs(600));
        assert_eq!(config.strategy("analytics").ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_unknown_strategy_falls_back_to_default() {
        let config = CacheConfig::default();
        let strategy = config.strategy("unknown");
        assert_eq!(strategy.name, DEFAULT_STRATEGY);
        assert_eq!(strategy.ttl, config.default_ttl);

        let mut bare = CacheConfig::default();
        bare.strategies.clear();
        assert_eq!(bare.strategy("users").max_size_bytes, None);
    }

    #[test]
    fn test_from_lookup_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("ADMIN_CACHE_DEFAULT_TTL_SECS", "60"),
            ("ADMIN_CACHE_JANITOR_PERIOD_SECS", "soon"),
            ("ADMIN_CACHE_SCHEMA_VERSION", "v3"),
            ("ADMIN_CACHE_COLLECTION", ""),
        ]
        .into_iter()
        .collect();

        let config = CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.strategy(DEFAULT_STRATEGY).ttl, Duration::from_secs(60));
        assert_eq!(config.janitor_period, Duration::from_secs(300));
        assert_eq!(config.schema_version, "v3");
        assert_eq!(config.collection, "adminCache");
    }

    #[test]
    fn test_with_strategy_replaces() {
        let config = CacheConfig::default().with_strategy(CacheStrategy::new(
            "stats",
            Duration::from_secs(5),
            None,
        ));
        assert_eq!(config.strategy("stats").ttl, Duration::from_secs(5));
    }
}
