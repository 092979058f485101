use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::ports::{Catalog, CatalogError, JobContext};
use crate::domain::entities::Blob;
use crate::domain::value_objects::BlobStatus;

/// The marked delete set and the counters that go with it
#[derive(Debug, Default)]
pub struct Candidates {
    /// Marked blobs in selection order, each at most once
    pub delete_set: Vec<Blob>,
    pub manifests: usize,
    pub other_blobs: usize,
    pub estimated_freed_bytes: u64,
    pub races_skipped: usize,
    pub errors: Vec<String>,
    /// A stop signal interrupted marking
    pub stopped: bool,
}

impl Candidates {
    /// Nothing marked, the run was interrupted before selection
    pub fn stopped() -> Self {
        Self {
            stopped: true,
            ..Self::default()
        }
    }

    fn push(&mut self, blob: Blob) {
        if blob.is_manifest() {
            self.manifests += 1;
        } else {
            self.other_blobs += 1;
        }
        self.estimated_freed_bytes += blob.reclaimable_bytes();
        self.delete_set.push(blob);
    }
}

/// Turns unreferenced blobs into marked candidates.
///
/// Marking is a conditional status write. A count of 0 means a live push
/// touched the blob after it was selected; such blobs stay out of the
/// delete set for this run.
pub struct CandidateSelector {
    catalog: Arc<dyn Catalog>,
}

impl CandidateSelector {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Select and mark the delete set.
    ///
    /// `extra` carries blobs only a dry run reports (blobs of simulated trash
    /// entries and of associations it would have removed). The set is
    /// de-duplicated by blob id. Failing to query the candidates is returned;
    /// a failed status write only skips that blob.
    pub async fn select(
        &self,
        ctx: &dyn JobContext,
        time_window_hours: u32,
        dry_run: bool,
        extra: Vec<Blob>,
    ) -> Result<Candidates, CatalogError> {
        let mut blobs = self.catalog.select_useless_blobs(time_window_hours).await?;
        blobs.extend(extra);

        let mut seen = HashSet::new();
        let mut candidates = Candidates::default();

        for blob in blobs {
            if !seen.insert(blob.id()) {
                continue;
            }

            if dry_run {
                info!("Blob eligible for deletion: {}", blob.digest());
                candidates.push(blob);
                continue;
            }

            if ctx.stop_requested() {
                info!("Stop requested while marking candidates");
                candidates.stopped = true;
                break;
            }

            if let Some(marked) = self.mark(blob, &mut candidates).await {
                info!("Blob eligible for deletion: {}", marked.digest());
                candidates.push(marked);
            }
        }

        info!(
            "{} blobs and {} manifests eligible for deletion",
            candidates.other_blobs, candidates.manifests
        );
        info!(
            "The GC could free up {} MB space, the size is a rough estimation",
            candidates.estimated_freed_bytes / 1024 / 1024
        );

        Ok(candidates)
    }

    /// Conditional `-> delete` write; returns the blob as now stored
    async fn mark(&self, mut blob: Blob, candidates: &mut Candidates) -> Option<Blob> {
        if let Err(e) = blob.check_transition(BlobStatus::Delete) {
            warn!("Skipping candidate {}: {}", blob.digest(), e);
            return None;
        }

        match self
            .catalog
            .update_blob_status(&blob, BlobStatus::Delete)
            .await
        {
            Ok(0) => {
                warn!(
                    "Blob changed since selection, skipping gc candidate. ID: {}, digest: {}",
                    blob.id(),
                    blob.digest()
                );
                candidates.races_skipped += 1;
                None
            }
            Ok(_) => match blob.apply_transition(BlobStatus::Delete) {
                Ok(()) => Some(blob),
                Err(e) => {
                    error!("Marked blob {} is inconsistent: {}", blob.digest(), e);
                    candidates
                        .errors
                        .push(format!("mark {}: {}", blob.digest(), e));
                    None
                }
            },
            Err(e) if e.is_not_found() => {
                debug!("Blob {} vanished before marking", blob.digest());
                None
            }
            Err(e) => {
                warn!(
                    "Failed to mark gc candidate, skipping: {}, error: {}",
                    blob.digest(),
                    e
                );
                candidates
                    .errors
                    .push(format!("mark {}: {}", blob.digest(), e));
                None
            }
        }
    }
}
