use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, TryStreamExt};
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::domain::entities::{Artifact, Blob, Project, TrashEntry};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{BlobStatus, Digest};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::NotFound(_) | CatalogError::Database(sqlx::Error::RowNotFound)
        )
    }
}

/// Port over the artifact catalog, the blob table, project-blob associations
/// and the artifact trash.
///
/// Status writes are conditional: `update_blob_status` only succeeds while the
/// row still carries the status and version observed in `blob`. A count of 0
/// means a concurrent mutator got there first.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// One page of projects with id greater than `after_id`, ordered by id
    async fn list_projects(
        &self,
        after_id: i64,
        page_size: i64,
    ) -> Result<Vec<Project>, CatalogError>;

    /// Artifacts without tags that are not children of an index
    async fn list_untagged_artifacts(&self) -> Result<Vec<Artifact>, CatalogError>;

    /// Move an artifact into the trash and drop its catalog row
    async fn delete_artifact(&self, id: i64) -> Result<TrashEntry, CatalogError>;

    /// Trash entries older than the window; 0 returns everything
    async fn list_trash(&self, time_window_hours: u32) -> Result<Vec<TrashEntry>, CatalogError>;

    /// Drop trash entries older than the window
    async fn flush_trash(&self, time_window_hours: u32) -> Result<u64, CatalogError>;

    /// Remove associations of `project_id` whose blob no artifact of the
    /// project references any more and whose `update_time <= as_of`
    async fn cleanup_project_associations(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<u64, CatalogError>;

    /// Read-only twin of `cleanup_project_associations` for dry runs
    async fn find_unassociated_blobs(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError>;

    /// Blobs with no project association and older than the window
    async fn select_useless_blobs(&self, time_window_hours: u32)
        -> Result<Vec<Blob>, CatalogError>;

    /// Blobs that deleting the given artifacts would release: referenced by
    /// at least one of them, by no other artifact, and `update_time <= as_of`
    async fn blobs_released_by(
        &self,
        artifact_ids: &[i64],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError>;

    /// Conditional status write, returns the number of rows updated (0 or 1)
    async fn update_blob_status(&self, blob: &Blob, to: BlobStatus) -> Result<u64, CatalogError>;

    /// Remove the blob row
    async fn delete_blob_record(&self, blob_id: i64) -> Result<(), CatalogError>;

    /// Drop artifact-to-blob links of a digest no catalogued artifact uses
    async fn cleanup_artifact_links(&self, artifact_digest: &Digest) -> Result<u64, CatalogError>;
}

/// Lazily walk every project, fetching `page_size` rows at a time.
///
/// The stream ends after the first error.
pub fn list_all_projects(
    catalog: &dyn Catalog,
    page_size: i64,
) -> impl Stream<Item = Result<Project, CatalogError>> + Send + '_ {
    stream::try_unfold(Some(0_i64), move |cursor| async move {
        let Some(after_id) = cursor else {
            return Ok::<_, CatalogError>(None);
        };
        let page = catalog.list_projects(after_id, page_size).await?;
        let next = if (page.len() as i64) < page_size {
            None
        } else {
            page.last().map(|project| project.id)
        };
        Ok(Some((
            stream::iter(page.into_iter().map(Ok::<_, CatalogError>)),
            next,
        )))
    })
    .try_flatten()
}
