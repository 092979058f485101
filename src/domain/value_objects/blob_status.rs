use serde::{Deserialize, Serialize};

/// GC lifecycle of a blob row.
///
/// A collector run moves a candidate `None -> Delete -> Deleting` and then
/// either removes the row or parks it in `DeleteFailed`. Pushes revive a
/// marked blob back to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobStatus {
    /// Live, usable by pulls and pushes
    #[default]
    None,
    /// Marked as a GC candidate
    Delete,
    /// Sweep in progress, invisible to pushes
    Deleting,
    /// Sweep failed, will be re-marked by a later run
    #[serde(rename = "deletefailed")]
    DeleteFailed,
}

impl BlobStatus {
    /// Check if transition is valid
    pub fn can_transition_to(&self, target: BlobStatus) -> bool {
        use BlobStatus::*;
        matches!(
            (self, target),
            (None | Delete | Deleting | DeleteFailed, Delete)
                | (Delete, Deleting)
                | (Deleting, DeleteFailed)
                | (Delete | DeleteFailed, None)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobStatus::None => "none",
            BlobStatus::Delete => "delete",
            BlobStatus::Deleting => "deleting",
            BlobStatus::DeleteFailed => "deletefailed",
        }
    }
}

impl std::fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BlobStatus::None),
            "delete" => Ok(BlobStatus::Delete),
            "deleting" => Ok(BlobStatus::Deleting),
            "deletefailed" => Ok(BlobStatus::DeleteFailed),
            _ => Err(format!("Invalid blob status: {}", s)),
        }
    }
}
