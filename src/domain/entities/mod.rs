mod artifact;
mod blob;
mod project;
mod trash_entry;

pub use artifact::Artifact;
pub use blob::Blob;
pub use project::Project;
pub use trash_entry::TrashEntry;
