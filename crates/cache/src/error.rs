use thiserror::Error;

/// Errors that can occur when talking to the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis server rejected a command or could not be reached.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A cached value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
