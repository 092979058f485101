use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::value_objects::Digest;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient backend failure: {message}")]
    Transient { status: Option<u16>, message: String },

    #[error("Backend rejected request: {message}")]
    Fatal { status: Option<u16>, message: String },

    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// Only transient failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transient { .. })
    }

    /// HTTP status behind the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::NotFound(_) => Some(404),
            BackendError::Transient { status, .. } | BackendError::Fatal { status, .. } => *status,
            BackendError::Unreachable(_) => None,
        }
    }
}

/// Port for the registry storage backend.
///
/// `NotFound` from either delete is reported as such; callers decide to
/// treat it as success.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Liveness probe, must pass before any destructive call
    async fn health(&self) -> Result<(), BackendError>;

    /// Remove a manifest and all of its tag/revision links under `repository`
    async fn delete_manifest(&self, repository: &str, digest: &Digest) -> Result<(), BackendError>;

    /// Remove a content-addressed blob from storage
    async fn delete_blob(&self, digest: &Digest) -> Result<(), BackendError>;
}
