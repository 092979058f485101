use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{is_foreign_layer, BlobKind, BlobStatus, Digest};

/// Blob entity - content-addressed registry object tracked for GC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    id: i64,
    digest: Digest,
    content_type: String,
    size: i64,
    status: BlobStatus,
    version: i64,
    update_time: DateTime<Utc>,
}

impl Blob {
    /// Reconstruct from storage
    pub fn reconstruct(
        id: i64,
        digest: Digest,
        content_type: String,
        size: i64,
        status: BlobStatus,
        version: i64,
        update_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            digest,
            content_type,
            size,
            status,
            version,
            update_time,
        }
    }

    /// Validate a status transition without applying it
    pub fn check_transition(&self, target: BlobStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: target,
            })
        }
    }

    /// Apply a transition that the store has accepted.
    ///
    /// Mirrors the store-side write: status changes and the version moves on.
    /// The update time is left alone, the time window keeps counting from the
    /// last push.
    pub fn apply_transition(&mut self, target: BlobStatus) -> Result<(), DomainError> {
        self.check_transition(target)?;
        self.status = target;
        self.version += 1;
        Ok(())
    }

    pub fn kind(&self) -> BlobKind {
        BlobKind::classify(&self.content_type)
    }

    pub fn is_manifest(&self) -> bool {
        self.kind() == BlobKind::Manifest
    }

    /// Foreign layers are referenced but never stored by the backend
    pub fn is_foreign_layer(&self) -> bool {
        is_foreign_layer(&self.content_type)
    }

    /// Bytes the backend would reclaim by deleting this blob
    pub fn reclaimable_bytes(&self) -> u64 {
        if self.is_foreign_layer() {
            0
        } else {
            self.size.max(0) as u64
        }
    }

    // Getters
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn status(&self) -> BlobStatus {
        self.status
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }
}
