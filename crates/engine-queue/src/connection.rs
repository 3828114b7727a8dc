use crate::config::QueueConfig;
use crate::{QueueError, Result};
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{debug, info};

/// Redis connection wrapper with a multiplexed connection manager.
#[derive(Clone)]
pub struct RedisConnection {
    manager: ConnectionManager,
    config: QueueConfig,
}

impl RedisConnection {
    pub async fn new(config: QueueConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        Ok(Self { manager, config })
    }

    pub fn get(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Delete every key matching `pattern`. Used when an order scope is
    /// torn down.
    pub async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| QueueError::Command(e.to_string()))?;

            if !keys.is_empty() {
                let n: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| QueueError::Command(e.to_string()))?;
                deleted += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        if deleted > 0 {
            debug!(pattern = %pattern, deleted = deleted, "Deleted queue keys");
        } else {
            info!(pattern = %pattern, "No queue keys matched for deletion");
        }
        Ok(deleted)
    }
}
