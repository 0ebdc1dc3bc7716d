use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::cache::Cache;
use crate::memory::InMemoryCache;
use crate::redis::RedisCache;

/// The cache backend chosen at startup.
///
/// Dispatches by `match` so services can hold one concrete cache type
/// whichever backend is configured.
#[derive(Clone)]
pub enum CacheProvider {
    Memory(InMemoryCache),
    Redis(RedisCache),
}

impl CacheProvider {
    /// Connects to Redis when a URL is given, otherwise uses an in-memory cache.
    pub async fn from_url(url: Option<&str>) -> Result<Self> {
        match url {
            Some(url) => {
                let cache = RedisCache::connect(url).await?;
                cache.ping().await?;
                Ok(CacheProvider::Redis(cache))
            }
            None => {
                tracing::info!("No Redis URL configured, using in-memory cache");
                Ok(CacheProvider::Memory(InMemoryCache::new()))
            }
        }
    }

    /// Short backend name for logs and health output.
    pub fn backend(&self) -> &'static str {
        match self {
            CacheProvider::Memory(_) => "memory",
            CacheProvider::Redis(_) => "redis",
        }
    }
}

impl From<InMemoryCache> for CacheProvider {
    fn from(cache: InMemoryCache) -> Self {
        CacheProvider::Memory(cache)
    }
}

impl From<RedisCache> for CacheProvider {
    fn from(cache: RedisCache) -> Self {
        CacheProvider::Redis(cache)
    }
}

#[async_trait]
impl Cache for CacheProvider {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            CacheProvider::Memory(cache) => cache.get(key).await,
            CacheProvider::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        match self {
            CacheProvider::Memory(cache) => cache.set(key, value, ttl).await,
            CacheProvider::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            CacheProvider::Memory(cache) => cache.delete(key).await,
            CacheProvider::Redis(cache) => cache.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn without_url_falls_back_to_memory() {
        let provider = CacheProvider::from_url(None).await.unwrap();
        assert_eq!(provider.backend(), "memory");

        provider
            .set("k", "v".to_string(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(provider.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
