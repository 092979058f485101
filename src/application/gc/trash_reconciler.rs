use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::ports::{list_all_projects, Catalog, CatalogError, JobContext};
use crate::domain::entities::{Blob, TrashEntry};
use crate::domain::value_objects::Digest;

/// Manifest digest to the distinct repositories it was trashed from
#[derive(Debug, Default, Clone)]
pub struct TrashedArtifacts {
    by_digest: HashMap<Digest, Vec<String>>,
}

impl TrashedArtifacts {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a TrashEntry>) -> Self {
        let mut trashed = Self::default();
        for entry in entries {
            trashed.insert(entry.digest.clone(), &entry.repository_name);
        }
        trashed
    }

    pub fn insert(&mut self, digest: Digest, repository: &str) {
        let repositories = self.by_digest.entry(digest).or_default();
        if !repositories.iter().any(|r| r == repository) {
            repositories.push(repository.to_string());
        }
    }

    /// Repositories to tear the manifest down in; empty when never trashed
    pub fn repositories(&self, digest: &Digest) -> &[String] {
        self.by_digest
            .get(digest)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}

/// Outcome of moving untagged artifacts into the trash
#[derive(Debug, Default)]
pub struct UntaggedCleanup {
    pub trashed: usize,
    pub failed: Vec<String>,
    /// Trash entries a dry run would have written
    pub simulated: Vec<TrashEntry>,
    /// Blobs only the simulated artifacts reference, reported as candidates
    /// by a dry run
    pub simulated_blobs: Vec<Blob>,
    pub stopped: bool,
}

/// Outcome of the project-blob association cleanup
#[derive(Debug, Default)]
pub struct AssociationCleanup {
    pub removed: u64,
    /// Blobs whose association a dry run would have removed
    pub would_release: Vec<Blob>,
    pub failed: Vec<String>,
    pub stopped: bool,
}

fn window_start(time_window_hours: u32) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(i64::from(time_window_hours))
}

/// Keeps the artifact trash, the untagged artifacts and the project-blob
/// associations in line before candidates are selected.
pub struct TrashReconciler {
    catalog: Arc<dyn Catalog>,
    project_page_size: i64,
}

impl TrashReconciler {
    pub fn new(catalog: Arc<dyn Catalog>, project_page_size: i64) -> Self {
        Self {
            catalog,
            project_page_size,
        }
    }

    /// Move every untagged artifact into the trash.
    ///
    /// Individual failures are logged and skipped. A dry run writes nothing
    /// and returns the entries it would have produced, plus the blobs that
    /// no remaining artifact would still reference. The stop signal is
    /// polled before each artifact.
    pub async fn remove_untagged(
        &self,
        ctx: &dyn JobContext,
        time_window_hours: u32,
        dry_run: bool,
    ) -> Result<UntaggedCleanup, CatalogError> {
        let artifacts = self.catalog.list_untagged_artifacts().await?;
        let mut cleanup = UntaggedCleanup::default();

        if artifacts.is_empty() {
            debug!("No untagged artifacts to remove");
            return Ok(cleanup);
        }

        let mut simulated_ids = Vec::new();
        for artifact in artifacts {
            if ctx.stop_requested() {
                info!("Stop requested while removing untagged artifacts");
                cleanup.stopped = true;
                return Ok(cleanup);
            }

            if dry_run {
                info!(
                    "Untagged artifact would be removed: {}@{}",
                    artifact.repository_name, artifact.digest
                );
                simulated_ids.push(artifact.id);
                cleanup.simulated.push(TrashEntry {
                    id: 0,
                    digest: artifact.digest,
                    repository_name: artifact.repository_name,
                    media_type: artifact.media_type,
                    manifest_media_type: artifact.manifest_media_type,
                    creation_time: Utc::now(),
                });
                cleanup.trashed += 1;
                continue;
            }

            match self.catalog.delete_artifact(artifact.id).await {
                Ok(entry) => {
                    info!("Untagged artifact moved to trash: {}", entry);
                    cleanup.trashed += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!("Untagged artifact {} already gone", artifact.id);
                }
                Err(e) => {
                    warn!(
                        "Failed to delete untagged artifact {}@{}, skipping: {}",
                        artifact.repository_name, artifact.digest, e
                    );
                    cleanup
                        .failed
                        .push(format!("untagged artifact {}: {}", artifact.id, e));
                }
            }
        }

        if !simulated_ids.is_empty() {
            match self
                .catalog
                .blobs_released_by(&simulated_ids, window_start(time_window_hours))
                .await
            {
                Ok(blobs) => cleanup.simulated_blobs = blobs,
                Err(e) => {
                    warn!("Failed to list blobs of untagged artifacts: {}", e);
                    cleanup
                        .failed
                        .push(format!("untagged artifact blobs: {}", e));
                }
            }
        }

        info!(
            "Untagged artifact cleanup: {} trashed, {} failed",
            cleanup.trashed,
            cleanup.failed.len()
        );
        Ok(cleanup)
    }

    /// Tear down associations no artifact of the project needs any more.
    ///
    /// Walks every project page by page, polling the stop signal before each
    /// one. A failure on one project is logged and the walk continues;
    /// failing to list projects is returned.
    pub async fn cleanup_associations(
        &self,
        ctx: &dyn JobContext,
        time_window_hours: u32,
        dry_run: bool,
    ) -> Result<AssociationCleanup, CatalogError> {
        let as_of = window_start(time_window_hours);
        let mut cleanup = AssociationCleanup::default();

        let mut projects = Box::pin(list_all_projects(
            self.catalog.as_ref(),
            self.project_page_size,
        ));
        while let Some(project) = projects.next().await {
            let project = project?;

            if ctx.stop_requested() {
                info!("Stop requested while cleaning up blob associations");
                cleanup.stopped = true;
                break;
            }

            if dry_run {
                match self
                    .catalog
                    .find_unassociated_blobs(project.id, as_of)
                    .await
                {
                    Ok(blobs) => cleanup.would_release.extend(blobs),
                    Err(e) => {
                        warn!(
                            "Failed to inspect blob associations of project {}: {}",
                            project.name, e
                        );
                        cleanup.failed.push(format!("project {}: {}", project.id, e));
                    }
                }
                continue;
            }

            match self
                .catalog
                .cleanup_project_associations(project.id, as_of)
                .await
            {
                Ok(removed) => {
                    if removed > 0 {
                        debug!(
                            "Removed {} blob associations of project {}",
                            removed, project.name
                        );
                    }
                    cleanup.removed += removed;
                }
                Err(e) => {
                    warn!(
                        "Failed to clean up blob associations of project {}: {}",
                        project.name, e
                    );
                    cleanup.failed.push(format!("project {}: {}", project.id, e));
                }
            }
        }

        Ok(cleanup)
    }

    /// Read the whole trash, plus any entries a dry run only simulated
    pub async fn collect_trash(
        &self,
        simulated: &[TrashEntry],
    ) -> Result<TrashedArtifacts, CatalogError> {
        let entries = self.catalog.list_trash(0).await?;
        let trashed = TrashedArtifacts::from_entries(entries.iter().chain(simulated.iter()));
        if trashed.is_empty() {
            warn!("No removed artifacts found in the trash");
        }
        Ok(trashed)
    }

    /// Drop trash entries older than the window
    pub async fn flush(&self, time_window_hours: u32) -> Result<u64, CatalogError> {
        let flushed = self.catalog.flush_trash(time_window_hours).await?;
        info!("Flushed {} artifact trash entries", flushed);
        Ok(flushed)
    }
}
