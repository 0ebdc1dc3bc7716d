use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::Result;
use crate::cache::Cache;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache used when no Redis server is configured, and in tests.
///
/// Expired entries are never returned; they are dropped on the next write.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` holds a live value.
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new();
        cache
            .set("product:1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("product:1").await.unwrap().as_deref(), Some("{}"));
        assert!(cache.contains("product:1").await);

        cache.delete("product:1").await.unwrap();
        assert!(cache.get("product:1").await.unwrap().is_none());

        // Deleting again is fine
        cache.delete("product:1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set("product:1", "cached".to_string(), Duration::from_secs(30))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("product:1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("product:1").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn set_replaces_value() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("k", "a".to_string(), ttl).await.unwrap();
        cache.set("k", "b".to_string(), ttl).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("b"));
        assert_eq!(cache.len().await, 1);
    }
}
