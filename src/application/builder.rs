use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::application::{
    gc::GarbageCollector,
    ports::{CacheConnector, Catalog, RegistryBackend},
};
use crate::config::Config;
use crate::infrastructure::{
    cache::RedisCacheConnector, persistence::PostgresCatalog, registry::HttpRegistryBackend,
};

/// Wires the collector to Postgres, the registry controller and the cache
pub struct ApplicationBuilder {
    config: Config,
    pool: Option<PgPool>,
    catalog: Option<Arc<dyn Catalog>>,
    backend: Option<Arc<dyn RegistryBackend>>,
    cache_connector: Option<Arc<dyn CacheConnector>>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: None,
            catalog: None,
            backend: None,
            cache_connector: None,
        }
    }

    /// Initialize database connection pool with retry logic
    pub async fn with_database(mut self) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to catalog database");

        let mut retries = 3;
        let mut delay = Duration::from_secs(1);
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(self.config.db_max_connections)
                .min_connections(self.config.db_min_connections)
                .acquire_timeout(Duration::from_secs(self.config.db_acquire_timeout_secs))
                .idle_timeout(Some(Duration::from_secs(self.config.db_idle_timeout_secs)))
                .max_lifetime(Some(Duration::from_secs(self.config.db_max_lifetime_secs)))
                .connect(&self.config.database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if retries > 0 => {
                    retries -= 1;
                    tracing::warn!(
                        "Database connection failed, retrying in {:?} ({} retries left): {}",
                        delay,
                        retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!("Failed to connect to database after retries: {}", e);
                    return Err(Box::new(e));
                }
            }
        };

        info!(
            "Database pool configured: max={}, min={}, acquire_timeout={}s",
            self.config.db_max_connections,
            self.config.db_min_connections,
            self.config.db_acquire_timeout_secs
        );

        // The registry usually owns the schema
        if self.config.run_migrations {
            info!("Running database migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
        }

        self.pool = Some(pool);
        Ok(self)
    }

    /// Initialize the catalog, backend client and cache connector
    pub fn with_infrastructure(mut self) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = self.pool.as_ref().ok_or("Database pool not initialized")?;

        let catalog: Arc<dyn Catalog> = Arc::new(PostgresCatalog::new(pool.clone()));
        let backend: Arc<dyn RegistryBackend> = Arc::new(HttpRegistryBackend::new(
            &self.config.registry_backend_url,
            Duration::from_secs(self.config.backend_connect_timeout_secs),
            Duration::from_secs(self.config.backend_request_timeout_secs),
            self.config.manifest_retry_policy(),
        )?);
        let cache_connector: Arc<dyn CacheConnector> =
            Arc::new(RedisCacheConnector::new(self.config.cache_timeouts()));

        self.catalog = Some(catalog);
        self.backend = Some(backend);
        self.cache_connector = Some(cache_connector);

        info!(
            backend = %self.config.registry_backend_url,
            "Infrastructure layer initialized"
        );
        Ok(self)
    }

    /// Get garbage collector instance
    pub fn build_gc(&self) -> Result<GarbageCollector, Box<dyn std::error::Error>> {
        let catalog = self.catalog.as_ref().ok_or("Catalog not initialized")?;
        let backend = self
            .backend
            .as_ref()
            .ok_or("Registry backend not initialized")?;
        let cache_connector = self
            .cache_connector
            .as_ref()
            .ok_or("Cache connector not initialized")?;

        Ok(GarbageCollector::new(
            Arc::clone(catalog),
            Arc::clone(backend),
            Arc::clone(cache_connector),
            self.config.gc_config(),
        ))
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
