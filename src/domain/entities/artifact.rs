use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Digest;

/// A manifest as catalogued in a repository, with the tags pointing at it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub project_id: i64,
    pub repository_name: String,
    /// Digest of the manifest blob
    pub digest: Digest,
    pub media_type: String,
    pub manifest_media_type: String,
    pub tags: Vec<String>,
}

impl Artifact {
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}
