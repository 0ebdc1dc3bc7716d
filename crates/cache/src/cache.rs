use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// Core trait for cache backends.
///
/// Values are opaque strings with a per-entry time to live. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value stored under `key`, or `None` if it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Extension trait providing typed JSON access on top of any cache.
#[async_trait]
pub trait CacheExt: Cache {
    /// Reads and decodes a JSON value.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a JSON value.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }
}

// Blanket implementation for all Cache implementations
impl<T: Cache + ?Sized> CacheExt for T {}
