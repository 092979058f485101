//! Run report of a garbage collection pass

use serde::Serialize;
use uuid::Uuid;

/// How a run that returned `Ok` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Mark and sweep ran to the end
    Completed,
    /// A stop signal ended the run early
    Stopped,
    /// Nothing was mutated, counts are estimates
    DryRun,
}

/// Counters produced while marking
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MarkStatistics {
    /// Untagged artifacts moved to the trash (simulated in a dry run)
    pub untagged_trashed: usize,
    /// Untagged artifacts that could not be moved
    pub untagged_failed: usize,
    /// Project-blob associations removed
    pub associations_removed: u64,
    /// Distinct manifest digests found in the trash
    pub trashed_manifests: usize,
    /// Candidates classified as manifests
    pub manifests: usize,
    /// Candidates classified as configs or layers
    pub other_blobs: usize,
    /// Rough estimate of reclaimable bytes; foreign layers count as 0
    pub estimated_freed_bytes: u64,
    /// Candidates lost to a concurrent mutator
    pub races_skipped: usize,
    /// Candidates skipped because the status write failed
    pub mark_errors: usize,
}

/// Counters produced while sweeping
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepStatistics {
    pub purged_manifests: usize,
    pub purged_blobs: usize,
    pub freed_bytes: u64,
    /// Candidates lost to a concurrent mutator between mark and sweep
    pub races_skipped: usize,
    /// Backend or catalog deletes that found nothing to delete
    pub not_found: usize,
}

/// Result of one collector run
#[derive(Debug, Clone, Serialize)]
pub struct GcReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub mark: MarkStatistics,
    pub sweep: SweepStatistics,
    /// Cache keys removed during invalidation
    pub cache_keys_purged: u64,
    /// Invalidation failure, logged and otherwise ignored
    pub cache_error: Option<String>,
    /// Trash entries flushed after the sweep
    pub trash_flushed: u64,
    /// Non-fatal errors that were logged and skipped
    pub errors: Vec<String>,
}

/// Progress document checked in with the job runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GcProgress {
    pub freed_space: u64,
    pub purged_blobs: u64,
    pub purged_manifests: u64,
}

impl GcReport {
    pub fn new(run_id: Uuid, status: RunStatus) -> Self {
        Self {
            run_id,
            status,
            mark: MarkStatistics::default(),
            sweep: SweepStatistics::default(),
            cache_keys_purged: 0,
            cache_error: None,
            trash_flushed: 0,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_dry_run(&self) -> bool {
        self.status == RunStatus::DryRun
    }

    /// Progress as reported to the runner: estimates for a dry run, actual
    /// sweep counts otherwise
    pub fn progress(&self) -> GcProgress {
        if self.is_dry_run() {
            GcProgress {
                freed_space: self.mark.estimated_freed_bytes,
                purged_blobs: self.mark.other_blobs as u64,
                purged_manifests: self.mark.manifests as u64,
            }
        } else {
            GcProgress {
                freed_space: self.sweep.freed_bytes,
                purged_blobs: self.sweep.purged_blobs as u64,
                purged_manifests: self.sweep.purged_manifests as u64,
            }
        }
    }

    /// JSON form of [`GcReport::progress`] for `JobContext::checkin`
    pub fn progress_json(&self) -> String {
        serde_json::to_string(&self.progress()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        if self.is_dry_run() {
            format!(
                "GC dry run: {} manifests and {} blobs eligible for deletion, could free about {} MB",
                self.mark.manifests,
                self.mark.other_blobs,
                self.mark.estimated_freed_bytes / 1024 / 1024
            )
        } else {
            format!(
                "GC {}: {} manifests and {} blobs deleted, freed {} MB (estimated {} MB)",
                match self.status {
                    RunStatus::Stopped => "stopped",
                    _ => "completed",
                },
                self.sweep.purged_manifests,
                self.sweep.purged_blobs,
                self.sweep.freed_bytes / 1024 / 1024,
                self.mark.estimated_freed_bytes / 1024 / 1024
            )
        }
    }

    pub fn details(&self) -> String {
        let mut details = vec![
            format!("Run: {}", self.run_id),
            format!("Untagged artifacts trashed: {}", self.mark.untagged_trashed),
            format!("Associations removed: {}", self.mark.associations_removed),
            format!(
                "Candidates: {} manifests, {} blobs ({} races skipped)",
                self.mark.manifests, self.mark.other_blobs, self.mark.races_skipped
            ),
            format!(
                "Deleted: {} manifests, {} blobs, {} bytes",
                self.sweep.purged_manifests, self.sweep.purged_blobs, self.sweep.freed_bytes
            ),
            format!("Cache keys purged: {}", self.cache_keys_purged),
            format!("Trash entries flushed: {}", self.trash_flushed),
        ];

        if let Some(cache_error) = &self.cache_error {
            details.push(format!("Cache invalidation failed: {}", cache_error));
        }
        if !self.errors.is_empty() {
            details.push("Errors:".to_string());
            for (i, error) in self.errors.iter().enumerate() {
                details.push(format!("  {}. {}", i + 1, error));
            }
        }

        details.join("\n")
    }
}
