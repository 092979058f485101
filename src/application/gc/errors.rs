use std::fmt;
use thiserror::Error;

use crate::application::gc::params::ParamError;
use crate::application::ports::{BackendError, CatalogError};
use crate::domain::value_objects::Digest;

/// Side effect of the per-candidate sweep that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStep {
    DeleteManifest,
    CleanupArtifactLinks,
    DeleteBlob,
    DeleteRecord,
}

impl fmt::Display for SweepStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepStep::DeleteManifest => "manifest deletion",
            SweepStep::CleanupArtifactLinks => "artifact link cleanup",
            SweepStep::DeleteBlob => "blob deletion",
            SweepStep::DeleteRecord => "blob record deletion",
        };
        f.write_str(name)
    }
}

/// Errors that end a garbage collection run
#[derive(Debug, Error)]
pub enum GcError {
    /// Parameters did not bind; nothing was touched
    #[error("Invalid garbage collection parameters: {0}")]
    Config(#[from] ParamError),

    /// Health check failed before any destructive call
    #[error("Registry backend is unreachable: {0}")]
    Unreachable(#[source] BackendError),

    /// A mark-phase catalog query failed
    #[error("Catalog query failed during mark: {0}")]
    Catalog(#[from] CatalogError),

    /// A sweep side effect failed; the candidate is parked in `deletefailed`
    #[error("Garbage collection aborted: {step} failed for {digest}{}: {reason}", repository_suffix(.repository))]
    Aborted {
        step: SweepStep,
        digest: Digest,
        repository: Option<String>,
        reason: String,
    },
}

fn repository_suffix(repository: &Option<String>) -> String {
    repository
        .as_ref()
        .map(|repo| format!(" in repository {}", repo))
        .unwrap_or_default()
}

impl GcError {
    pub fn aborted(
        step: SweepStep,
        digest: &Digest,
        repository: Option<&str>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::Aborted {
            step,
            digest: digest.clone(),
            repository: repository.map(str::to_string),
            reason: reason.to_string(),
        }
    }

    /// Process exit code reported to the job runner
    pub fn exit_code(&self) -> i32 {
        match self {
            GcError::Config(_) => 2,
            GcError::Unreachable(_) => 3,
            GcError::Aborted { .. } => 4,
            GcError::Catalog(_) => 5,
        }
    }

    /// Environmental failures the runner may simply schedule again
    pub fn is_retriable(&self) -> bool {
        matches!(self, GcError::Unreachable(_) | GcError::Catalog(_))
    }
}
