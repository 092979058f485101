pub mod cache_invalidator;
pub mod candidate_selector;
pub mod config;
pub mod errors;
pub mod params;
pub mod results;
pub mod sweeper;
pub mod trash_reconciler;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cache_invalidator::{CacheInvalidator, REGISTRY_CACHE_PATTERNS};
pub use candidate_selector::{CandidateSelector, Candidates};
pub use config::GcConfig;
pub use errors::{GcError, SweepStep};
pub use params::{GcParameters, JobParameters, ParamError, DEFAULT_TIME_WINDOW_HOURS};
pub use results::{GcProgress, GcReport, MarkStatistics, RunStatus, SweepStatistics};
pub use sweeper::{SweepEnd, Sweeper};
pub use trash_reconciler::{TrashReconciler, TrashedArtifacts};
pub use worker::GarbageCollector;
