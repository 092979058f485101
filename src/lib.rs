//! # registry_gc - Mark-and-sweep garbage collection for a container registry
//!
//! Reclaims storage held by blobs and manifests that no tagged artifact
//! references any more, while the registry keeps serving pushes and pulls.
//!
//! ## Architecture Layers
//!
//! - **Domain**: blobs, artifacts, trash entries, digests and the blob status
//!   state machine
//! - **Application**: ports (catalog, registry backend, metadata cache, job
//!   context) and the collector itself
//! - **Infrastructure**: Postgres catalog, HTTP registry backend client, Redis
//!   cache adapter
//!
//! ## Safety
//!
//! - Status changes on a blob are compare-and-set, a concurrent push wins
//! - Manifest indirections are removed before the blob they point at
//! - Deletes are idempotent, an interrupted run is finished by the next one
//!
//! ## Example Usage
//!
//! ```no_run
//! use registry_gc::{application::builder::ApplicationBuilder, Config, LocalJobContext};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = ApplicationBuilder::new(Config::from_env())
//!     .with_database()
//!     .await?
//!     .with_infrastructure()?;
//! let gc = builder.build_gc()?;
//!
//! let ctx = LocalJobContext::new(CancellationToken::new());
//! let params = serde_json::json!({ "dry_run": true }).as_object().cloned().unwrap_or_default();
//! let report = gc.run(&ctx, &params).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::gc::{GarbageCollector, GcError, GcReport, JobParameters};
pub use application::ports;
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, value_objects};
pub use infrastructure::LocalJobContext;
