use std::time::Duration;

use async_trait::async_trait;
use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;

use crate::Result;
use crate::cache::Cache;

/// Redis-backed cache.
///
/// Values are plain string keys written with `SET ... EX`. The connection
/// manager reconnects on its own, so clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connects to the server at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis cache");
        Ok(Self { manager })
    }

    /// Round-trips a `PING` to the server.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        ::redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        // Redis rejects an expiry of zero seconds
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
