/// Error type for cache operations.
///
/// These never reach a `get_or_fetch` caller: the coordinator logs them and
/// degrades to recomputing through the producer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// A backend operation failed.
    #[error("[{tier}] cache error for key '{key}': {message}")]
    Operation {
        tier: String,
        key: String,
        message: String,
    },
    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend is not reachable at the moment.
    #[error("[{tier}] backend unavailable")]
    Unavailable { tier: String },
}

impl CacheError {
    /// Create a new operation error.
    pub fn operation(
        tier: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Operation {
            tier: tier.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new unavailable error.
    pub fn unavailable(tier: impl Into<String>) -> Self {
        CacheError::Unavailable { tier: tier.into() }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
