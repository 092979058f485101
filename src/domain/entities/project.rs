use serde::{Deserialize, Serialize};

/// Tenancy unit owning repositories and project-blob associations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
}
