use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::gc::errors::{GcError, SweepStep};
use crate::application::gc::results::SweepStatistics;
use crate::application::gc::trash_reconciler::TrashedArtifacts;
use crate::application::ports::{Catalog, JobContext, RegistryBackend};
use crate::domain::entities::Blob;
use crate::domain::value_objects::BlobStatus;

/// How a sweep that did not abort ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEnd {
    Completed,
    Stopped,
}

/// Deletes marked candidates one at a time.
///
/// Per candidate: `delete -> deleting` (conditional), then the manifest in
/// every repository it was trashed from, then the artifact links, then the
/// blob in storage, then the blob row. NotFound anywhere counts as done. Any
/// other failure parks the blob in `deletefailed` and aborts the sweep.
pub struct Sweeper {
    catalog: Arc<dyn Catalog>,
    backend: Arc<dyn RegistryBackend>,
}

impl Sweeper {
    pub fn new(catalog: Arc<dyn Catalog>, backend: Arc<dyn RegistryBackend>) -> Self {
        Self { catalog, backend }
    }

    /// Sweep the delete set in order.
    ///
    /// The stop signal is polled between candidates only. `stats` is updated
    /// as candidates complete, so it is accurate after an abort too.
    pub async fn sweep(
        &self,
        ctx: &dyn JobContext,
        delete_set: Vec<Blob>,
        trashed: &TrashedArtifacts,
        stats: &mut SweepStatistics,
    ) -> Result<SweepEnd, GcError> {
        let total = delete_set.len();

        for (index, blob) in delete_set.into_iter().enumerate() {
            if ctx.stop_requested() {
                info!("Stop requested, leaving {} candidates for the next run", total - index);
                return Ok(SweepEnd::Stopped);
            }
            self.sweep_one(blob, index + 1, total, trashed, stats)
                .await?;
        }

        info!(
            "{} blobs and {} manifests are actually deleted",
            stats.purged_blobs, stats.purged_manifests
        );
        info!(
            "The GC job actually frees up {} MB space",
            stats.freed_bytes / 1024 / 1024
        );
        Ok(SweepEnd::Completed)
    }

    async fn sweep_one(
        &self,
        mut blob: Blob,
        position: usize,
        total: usize,
        trashed: &TrashedArtifacts,
        stats: &mut SweepStatistics,
    ) -> Result<(), GcError> {
        // A push that touched the blob since marking makes this write miss
        match self
            .catalog
            .update_blob_status(&blob, BlobStatus::Deleting)
            .await
        {
            Ok(0) => {
                warn!(
                    "[{}/{}] blob changed since marking, skipping. ID: {}, digest: {}",
                    position,
                    total,
                    blob.id(),
                    blob.digest()
                );
                stats.races_skipped += 1;
                return Ok(());
            }
            Ok(_) => {
                if let Err(e) = blob.apply_transition(BlobStatus::Deleting) {
                    error!("[{}/{}] {}: {}", position, total, blob.digest(), e);
                    return Ok(());
                }
            }
            Err(e) => {
                error!(
                    "[{}/{}] failed to mark gc candidate deleting, skipping: {}, {}",
                    position,
                    total,
                    blob.digest(),
                    e
                );
                return Ok(());
            }
        }

        if blob.is_manifest() {
            let repositories = trashed.repositories(blob.digest());
            for repository in repositories {
                info!(
                    "[{}/{}] delete the manifest: {}, {}, {}",
                    position,
                    total,
                    repository,
                    blob.content_type(),
                    blob.digest()
                );
                match self.backend.delete_manifest(repository, blob.digest()).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!("[{}/{}] manifest already gone in {}", position, total, repository);
                        stats.not_found += 1;
                    }
                    Err(e) => {
                        return Err(self
                            .fail(&blob, SweepStep::DeleteManifest, Some(repository.as_str()), e)
                            .await)
                    }
                }
            }

            if !repositories.is_empty() {
                info!(
                    "[{}/{}] delete artifact blob links: {}",
                    position,
                    total,
                    blob.digest()
                );
                match self.catalog.cleanup_artifact_links(blob.digest()).await {
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        return Err(self
                            .fail(&blob, SweepStep::CleanupArtifactLinks, None, e)
                            .await)
                    }
                }
            }
        }

        // Foreign layers were never uploaded; only the record goes
        if !blob.is_foreign_layer() {
            info!(
                "[{}/{}] delete blob from storage: {}",
                position,
                total,
                blob.digest()
            );
            match self.backend.delete_blob(blob.digest()).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!("[{}/{}] blob already gone from storage", position, total);
                    stats.not_found += 1;
                }
                Err(e) => return Err(self.fail(&blob, SweepStep::DeleteBlob, None, e).await),
            }
            stats.freed_bytes += blob.reclaimable_bytes();
        }

        info!(
            "[{}/{}] delete blob record from database: {}, {}",
            position,
            total,
            blob.id(),
            blob.digest()
        );
        match self.catalog.delete_blob_record(blob.id()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                stats.not_found += 1;
            }
            Err(e) => return Err(self.fail(&blob, SweepStep::DeleteRecord, None, e).await),
        }

        if blob.is_manifest() {
            stats.purged_manifests += 1;
        } else {
            stats.purged_blobs += 1;
        }
        Ok(())
    }

    /// Park the blob in `deletefailed` and build the abort error
    async fn fail(
        &self,
        blob: &Blob,
        step: SweepStep,
        repository: Option<&str>,
        reason: impl Display,
    ) -> GcError {
        error!(
            "{} failed for {}{}: {}",
            step,
            blob.digest(),
            repository
                .map(|r| format!(" in {}", r))
                .unwrap_or_default(),
            reason
        );

        match self
            .catalog
            .update_blob_status(blob, BlobStatus::DeleteFailed)
            .await
        {
            Ok(0) => warn!("Blob {} changed before it could be marked failed", blob.digest()),
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => error!("Failed to mark blob {} delete failed: {}", blob.digest(), e),
        }

        GcError::aborted(step, blob.digest(), repository, reason)
    }
}
