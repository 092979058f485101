mod http_registry_backend;
mod retry;

pub use http_registry_backend::HttpRegistryBackend;
pub use retry::RetryPolicy;
