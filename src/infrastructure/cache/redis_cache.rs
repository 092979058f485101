use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::Duration;

use crate::application::ports::{CacheConnector, CacheError, RegistryCache};

/// Client-side bounds on every cache round trip
#[derive(Debug, Clone, Copy)]
pub struct CacheTimeouts {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for CacheTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(70),
            write: Duration::from_secs(10),
        }
    }
}

async fn bounded<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(|e| CacheError::Command(e.to_string())),
        Err(_) => Err(CacheError::Timeout { operation, after }),
    }
}

pub struct RedisCacheConnector {
    timeouts: CacheTimeouts,
}

impl RedisCacheConnector {
    pub fn new(timeouts: CacheTimeouts) -> Self {
        Self { timeouts }
    }
}

#[async_trait]
impl CacheConnector for RedisCacheConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn RegistryCache>, CacheError> {
        let client =
            redis::Client::open(endpoint).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = match tokio::time::timeout(
            self.timeouts.connect,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => conn.map_err(|e| CacheError::Connection(e.to_string()))?,
            Err(_) => {
                return Err(CacheError::Timeout {
                    operation: "connect",
                    after: self.timeouts.connect,
                })
            }
        };

        Ok(Box::new(RedisCache {
            conn,
            timeouts: self.timeouts,
        }))
    }
}

/// One open connection; closed when dropped
pub struct RedisCache {
    conn: MultiplexedConnection,
    timeouts: CacheTimeouts,
}

#[async_trait]
impl RegistryCache for RedisCache {
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);

        bounded(
            "scan",
            self.timeouts.read,
            cmd.query_async::<(u64, Vec<String>)>(&mut self.conn),
        )
        .await
    }

    async fn delete(&mut self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        cmd.arg(keys);

        bounded(
            "delete",
            self.timeouts.write,
            cmd.query_async::<u64>(&mut self.conn),
        )
        .await
    }
}
