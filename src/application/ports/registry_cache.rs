use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Command(String),

    #[error("Cache {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// An open session on the registry's key/value metadata cache
#[async_trait]
pub trait RegistryCache: Send {
    /// One cursor step of a pattern scan; a returned cursor of 0 ends the scan
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError>;

    /// Delete keys, returns how many existed
    async fn delete(&mut self, keys: &[String]) -> Result<u64, CacheError>;
}

/// Opens cache sessions; the session is dropped when invalidation ends
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn RegistryCache>, CacheError>;
}
