use std::sync::Arc;
use tracing::{debug, info};

use crate::application::ports::{CacheConnector, CacheError, RegistryCache};

/// Key patterns of the registry's metadata cache that go stale after a sweep
pub const REGISTRY_CACHE_PATTERNS: &[&str] = &["blobs::*", "repository::*", "upload:*:size"];

/// Purges pattern-matched keys from the registry's metadata cache.
///
/// Keys are scanned with a cursor and deleted one batch at a time, so the
/// key space is never held in memory. Keys written after the scan started
/// may survive.
pub struct CacheInvalidator {
    connector: Arc<dyn CacheConnector>,
    scan_count: usize,
}

impl CacheInvalidator {
    pub fn new(connector: Arc<dyn CacheConnector>, scan_count: usize) -> Self {
        Self {
            connector,
            scan_count: scan_count.max(1),
        }
    }

    /// Delete every key matching `patterns`, returns how many were removed.
    ///
    /// The first error stops the purge; keys already deleted stay deleted.
    pub async fn purge(&self, endpoint: &str, patterns: &[&str]) -> Result<u64, CacheError> {
        let mut cache = self.connector.connect(endpoint).await?;
        let mut removed = 0;

        for pattern in patterns {
            let purged = self.purge_pattern(cache.as_mut(), pattern).await?;
            debug!("Purged {} cache keys matching {}", purged, pattern);
            removed += purged;
        }

        info!("Cache invalidated, {} keys removed", removed);
        Ok(removed)
    }

    async fn purge_pattern(
        &self,
        cache: &mut dyn RegistryCache,
        pattern: &str,
    ) -> Result<u64, CacheError> {
        let mut cursor = 0;
        let mut removed = 0;

        loop {
            let (next, keys) = cache.scan(cursor, pattern, self.scan_count).await?;
            if !keys.is_empty() {
                removed += cache.delete(&keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
