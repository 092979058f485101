pub mod cache;
pub mod job_context;
pub mod persistence;
pub mod registry;

pub use job_context::LocalJobContext;
