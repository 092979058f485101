use thiserror::Error;

use super::value_objects::BlobStatus;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid blob status transition from {from} to {to}")]
    InvalidStatusTransition { from: BlobStatus, to: BlobStatus },

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid blob status: {0}")]
    InvalidStatus(String),
}
