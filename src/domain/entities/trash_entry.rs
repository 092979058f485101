use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Digest;

/// An artifact removed from the catalog whose backend manifest still has to be torn down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub id: i64,
    pub digest: Digest,
    pub repository_name: String,
    pub media_type: String,
    pub manifest_media_type: String,
    pub creation_time: DateTime<Utc>,
}

impl std::fmt::Display for TrashEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "trash entry {} [repository: {}, digest: {}, manifest media type: {}, created: {}]",
            self.id,
            self.repository_name,
            self.digest,
            self.manifest_media_type,
            self.creation_time.to_rfc3339()
        )
    }
}
