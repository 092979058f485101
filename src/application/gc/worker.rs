use std::sync::Arc;
use tracing::field::Empty;
use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::application::gc::cache_invalidator::{CacheInvalidator, REGISTRY_CACHE_PATTERNS};
use crate::application::gc::candidate_selector::{CandidateSelector, Candidates};
use crate::application::gc::config::GcConfig;
use crate::application::gc::errors::GcError;
use crate::application::gc::params::{GcParameters, JobParameters};
use crate::application::gc::results::{GcReport, RunStatus};
use crate::application::gc::sweeper::{SweepEnd, Sweeper};
use crate::application::gc::trash_reconciler::{TrashReconciler, TrashedArtifacts};
use crate::application::ports::{CacheConnector, Catalog, JobContext, RegistryBackend};

/// Mark-and-sweep garbage collector for registry blobs.
///
/// One call to [`GarbageCollector::run`] is one bounded pass:
///
/// 1. **Init**: bind parameters, honour an early stop, check backend health.
/// 2. **Mark**: trash untagged artifacts, read the trash, drop stale
///    project-blob associations, then mark every unreferenced blob older than
///    the time window as a candidate.
/// 3. **Sweep**: delete candidates one by one (skipped for a dry run).
/// 4. **CacheInvalidate**: purge the registry's metadata cache.
/// 5. **Done**: flush the trash.
///
/// Collaborators are injected so tests can swap in fakes. The job runner
/// guarantees at most one run at a time.
pub struct GarbageCollector {
    catalog: Arc<dyn Catalog>,
    backend: Arc<dyn RegistryBackend>,
    cache_connector: Arc<dyn CacheConnector>,
    config: GcConfig,
}

impl GarbageCollector {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        backend: Arc<dyn RegistryBackend>,
        cache_connector: Arc<dyn CacheConnector>,
        config: GcConfig,
    ) -> Self {
        Self {
            catalog,
            backend,
            cache_connector,
            config,
        }
    }

    /// Run one garbage collection pass.
    ///
    /// Returns `Ok` when the run completed, was stopped, or was a dry run.
    /// Individual candidates that lost a race or failed to mark are logged
    /// and reported, not returned.
    pub async fn run(
        &self,
        ctx: &dyn JobContext,
        params: &JobParameters,
    ) -> Result<GcReport, GcError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "gc_run",
            %run_id,
            dry_run = Empty,
            time_window_hours = Empty
        );
        self.execute(run_id, ctx, params).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        ctx: &dyn JobContext,
        raw_params: &JobParameters,
    ) -> Result<GcReport, GcError> {
        info!(phase = "Init", "Starting garbage collection");

        let params = GcParameters::bind(raw_params, ctx).map_err(|e| {
            error!(phase = "Aborted", "Invalid garbage collection parameters: {}", e);
            GcError::from(e)
        })?;
        Span::current().record("dry_run", params.dry_run);
        Span::current().record("time_window_hours", params.time_window_hours);

        let status = if params.dry_run {
            RunStatus::DryRun
        } else {
            RunStatus::Completed
        };
        let mut report = GcReport::new(run_id, status);

        if ctx.stop_requested() {
            info!("Received the stop signal before start, quit GC job");
            report.status = RunStatus::Stopped;
            return Ok(report);
        }

        if let Err(e) = self.backend.health().await {
            error!(phase = "Aborted", "Registry backend health check failed: {}", e);
            return Err(GcError::Unreachable(e));
        }

        info!(phase = "Mark", "Marking garbage collection candidates");
        let reconciler = TrashReconciler::new(
            Arc::clone(&self.catalog),
            self.config.project_page_size,
        );
        let (candidates, trashed) = match self.mark(ctx, &params, &reconciler, &mut report).await {
            Ok(marked) => marked,
            Err(e) => {
                error!(
                    phase = "Aborted",
                    "Failed to execute GC job at mark phase: {}", e
                );
                return Err(e);
            }
        };

        if candidates.stopped {
            info!("Received the stop signal while marking, quit GC job");
            report.status = RunStatus::Stopped;
            return Ok(report);
        }

        if params.dry_run {
            ctx.checkin(&report.progress_json());
            info!(phase = "Done", "{}", report.summary());
            return Ok(report);
        }

        info!(
            phase = "Sweep",
            "Sweeping {} candidates",
            candidates.delete_set.len()
        );
        let sweeper = Sweeper::new(Arc::clone(&self.catalog), Arc::clone(&self.backend));
        let end = sweeper
            .sweep(ctx, candidates.delete_set, &trashed, &mut report.sweep)
            .await;
        ctx.checkin(&report.progress_json());

        let end = match end {
            Ok(end) => end,
            Err(e) => {
                error!(
                    phase = "Aborted",
                    "Failed to execute GC job at sweep phase: {}", e
                );
                return Err(e);
            }
        };

        // Runs after a stop too: some candidates may already be gone
        self.invalidate_cache(&params, &mut report).await;

        if end == SweepEnd::Stopped {
            info!("Received the stop signal, quit GC job after cleaning up the cache");
            report.status = RunStatus::Stopped;
            return Ok(report);
        }

        match reconciler.flush(params.time_window_hours).await {
            Ok(flushed) => report.trash_flushed = flushed,
            Err(e) => {
                warn!("Failed to flush the artifact trash: {}", e);
                report.add_error(format!("flush trash: {}", e));
            }
        }

        info!(phase = "Done", "{}", report.summary());
        Ok(report)
    }

    async fn mark(
        &self,
        ctx: &dyn JobContext,
        params: &GcParameters,
        reconciler: &TrashReconciler,
        report: &mut GcReport,
    ) -> Result<(Candidates, TrashedArtifacts), GcError> {
        let mut extra = Vec::new();

        let mut simulated = Vec::new();
        if params.delete_untagged {
            let untagged = reconciler
                .remove_untagged(ctx, params.time_window_hours, params.dry_run)
                .await?;
            report.mark.untagged_trashed = untagged.trashed;
            report.mark.untagged_failed = untagged.failed.len();
            report.errors.extend(untagged.failed);
            if untagged.stopped {
                return Ok((Candidates::stopped(), TrashedArtifacts::default()));
            }
            extra.extend(untagged.simulated_blobs);
            simulated = untagged.simulated;
        }

        let trashed = reconciler.collect_trash(&simulated).await?;
        report.mark.trashed_manifests = trashed.len();

        // Associations go first: candidate selection reads them
        let associations = reconciler
            .cleanup_associations(ctx, params.time_window_hours, params.dry_run)
            .await?;
        report.mark.associations_removed = associations.removed;
        report.errors.extend(associations.failed);
        if associations.stopped {
            return Ok((Candidates::stopped(), trashed));
        }
        extra.extend(associations.would_release);

        let mut candidates = CandidateSelector::new(Arc::clone(&self.catalog))
            .select(ctx, params.time_window_hours, params.dry_run, extra)
            .await?;

        report.mark.manifests = candidates.manifests;
        report.mark.other_blobs = candidates.other_blobs;
        report.mark.estimated_freed_bytes = candidates.estimated_freed_bytes;
        report.mark.races_skipped = candidates.races_skipped;
        report.mark.mark_errors = candidates.errors.len();
        report.errors.append(&mut candidates.errors);

        Ok((candidates, trashed))
    }

    async fn invalidate_cache(&self, params: &GcParameters, report: &mut GcReport) {
        let Some(endpoint) = params.cache_endpoint.as_deref() else {
            warn!("No cache endpoint configured, skipping cache invalidation");
            return;
        };

        info!(phase = "CacheInvalidate", "Invalidating registry cache");
        let invalidator = CacheInvalidator::new(
            Arc::clone(&self.cache_connector),
            self.config.cache_scan_count,
        );
        match invalidator.purge(endpoint, REGISTRY_CACHE_PATTERNS).await {
            Ok(purged) => report.cache_keys_purged = purged,
            Err(e) => {
                warn!("Failed to invalidate registry cache, next run will cover it: {}", e);
                report.cache_error = Some(e.to_string());
            }
        }
    }
}
