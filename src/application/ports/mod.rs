mod catalog;
mod job_context;
mod registry_backend;
mod registry_cache;

pub use catalog::{list_all_projects, Catalog, CatalogError};
pub use job_context::JobContext;
pub use registry_backend::{BackendError, RegistryBackend};
pub use registry_cache::{CacheConnector, CacheError, RegistryCache};

#[cfg(test)]
pub use catalog::MockCatalog;
#[cfg(test)]
pub use job_context::MockJobContext;
#[cfg(test)]
pub use registry_backend::MockRegistryBackend;
