use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::application::ports::{Catalog, CatalogError};
use crate::domain::entities::{Artifact, Blob, Project, TrashEntry};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{BlobStatus, Digest};

const BLOB_COLUMNS: &str = "b.id, b.digest, b.content_type, b.size, b.status, b.version, b.update_time";

/// Postgres-backed catalog over the artifact, blob, project_blob and
/// artifact_trash tables
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `make_interval` takes an int4
fn window_hours(time_window_hours: u32) -> i32 {
    i32::try_from(time_window_hours).unwrap_or(i32::MAX)
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn list_projects(
        &self,
        after_id: i64,
        page_size: i64,
    ) -> Result<Vec<Project>, CatalogError> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name
            FROM project
            WHERE id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after_id)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProjectRow::into_domain).collect())
    }

    async fn list_untagged_artifacts(&self) -> Result<Vec<Artifact>, CatalogError> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            r#"
            SELECT a.id, a.project_id, a.repository_name, a.digest, a.media_type, a.manifest_media_type
            FROM artifact a
            WHERE NOT EXISTS (SELECT 1 FROM tag t WHERE t.artifact_id = a.id)
              AND NOT EXISTS (SELECT 1 FROM artifact_reference r WHERE r.child_id = a.id)
            ORDER BY a.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ArtifactRow::into_domain).collect()
    }

    async fn delete_artifact(&self, id: i64) -> Result<TrashEntry, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, RemovedArtifactRow>(
            r#"
            DELETE FROM artifact
            WHERE id = $1
            RETURNING repository_name, digest, media_type, manifest_media_type
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("artifact {}", id)))?;

        // Re-trashing the same digest in a repository keeps the original entry
        let row = sqlx::query_as::<_, TrashRow>(
            r#"
            INSERT INTO artifact_trash (media_type, manifest_media_type, repository_name, digest)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (repository_name, digest)
            DO UPDATE SET creation_time = artifact_trash.creation_time
            RETURNING id, digest, repository_name, media_type, manifest_media_type, creation_time
            "#,
        )
        .bind(&removed.media_type)
        .bind(&removed.manifest_media_type)
        .bind(&removed.repository_name)
        .bind(&removed.digest)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_domain()
    }

    async fn list_trash(&self, time_window_hours: u32) -> Result<Vec<TrashEntry>, CatalogError> {
        let rows = sqlx::query_as::<_, TrashRow>(
            r#"
            SELECT id, digest, repository_name, media_type, manifest_media_type, creation_time
            FROM artifact_trash
            WHERE creation_time <= now() - make_interval(hours => $1)
            ORDER BY id
            "#,
        )
        .bind(window_hours(time_window_hours))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrashRow::into_domain).collect()
    }

    async fn flush_trash(&self, time_window_hours: u32) -> Result<u64, CatalogError> {
        let result = sqlx::query(
            "DELETE FROM artifact_trash WHERE creation_time <= now() - make_interval(hours => $1)",
        )
        .bind(window_hours(time_window_hours))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn cleanup_project_associations(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<u64, CatalogError> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_blob pb
            USING blob b
            WHERE pb.blob_id = b.id
              AND pb.project_id = $1
              AND b.update_time <= $2
              AND NOT EXISTS (
                  SELECT 1
                  FROM artifact a
                  WHERE a.project_id = $1
                    AND (a.digest = b.digest
                         OR EXISTS (SELECT 1 FROM artifact_blob ab
                                    WHERE ab.digest_af = a.digest AND ab.digest_blob = b.digest))
              )
            "#,
        )
        .bind(project_id)
        .bind(as_of)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_unassociated_blobs(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError> {
        let rows = sqlx::query_as::<_, BlobRow>(&format!(
            r#"
            SELECT {BLOB_COLUMNS}
            FROM project_blob pb
            JOIN blob b ON b.id = pb.blob_id
            WHERE pb.project_id = $1
              AND b.update_time <= $2
              AND NOT EXISTS (
                  SELECT 1
                  FROM artifact a
                  WHERE a.project_id = $1
                    AND (a.digest = b.digest
                         OR EXISTS (SELECT 1 FROM artifact_blob ab
                                    WHERE ab.digest_af = a.digest AND ab.digest_blob = b.digest))
              )
            ORDER BY b.id
            "#
        ))
        .bind(project_id)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlobRow::into_domain).collect()
    }

    async fn select_useless_blobs(
        &self,
        time_window_hours: u32,
    ) -> Result<Vec<Blob>, CatalogError> {
        let rows = sqlx::query_as::<_, BlobRow>(&format!(
            r#"
            SELECT {BLOB_COLUMNS}
            FROM blob b
            LEFT JOIN project_blob pb ON pb.blob_id = b.id
            WHERE pb.id IS NULL
              AND b.update_time <= now() - make_interval(hours => $1)
            ORDER BY b.id
            "#
        ))
        .bind(window_hours(time_window_hours))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlobRow::into_domain).collect()
    }

    async fn blobs_released_by(
        &self,
        artifact_ids: &[i64],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError> {
        let rows = sqlx::query_as::<_, BlobRow>(&format!(
            r#"
            SELECT {BLOB_COLUMNS}
            FROM blob b
            WHERE b.update_time <= $2
              AND EXISTS (
                  SELECT 1
                  FROM artifact a
                  WHERE a.id = ANY($1)
                    AND (a.digest = b.digest
                         OR EXISTS (SELECT 1 FROM artifact_blob ab
                                    WHERE ab.digest_af = a.digest AND ab.digest_blob = b.digest))
              )
              AND NOT EXISTS (
                  SELECT 1
                  FROM artifact a
                  WHERE a.id <> ALL($1)
                    AND (a.digest = b.digest
                         OR EXISTS (SELECT 1 FROM artifact_blob ab
                                    WHERE ab.digest_af = a.digest AND ab.digest_blob = b.digest))
              )
            ORDER BY b.id
            "#
        ))
        .bind(artifact_ids)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BlobRow::into_domain).collect()
    }

    async fn update_blob_status(&self, blob: &Blob, to: BlobStatus) -> Result<u64, CatalogError> {
        blob.check_transition(to)?;

        // Any writer bumps the version, so a stale observation matches no row.
        // update_time stays: it is the push time the window is measured from.
        let result = sqlx::query(
            r#"
            UPDATE blob
            SET status = $1, version = version + 1
            WHERE id = $2 AND version = $3 AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(blob.id())
        .bind(blob.version())
        .bind(blob.status().as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_blob_record(&self, blob_id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM blob WHERE id = $1")
            .bind(blob_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!("blob {}", blob_id)));
        }
        Ok(())
    }

    async fn cleanup_artifact_links(&self, artifact_digest: &Digest) -> Result<u64, CatalogError> {
        let result = sqlx::query(
            r#"
            DELETE FROM artifact_blob
            WHERE digest_af = $1
              AND NOT EXISTS (SELECT 1 FROM artifact a WHERE a.digest = $1)
            "#,
        )
        .bind(artifact_digest.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
}

impl ProjectRow {
    fn into_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ArtifactRow {
    id: i64,
    project_id: i64,
    repository_name: String,
    digest: String,
    media_type: String,
    manifest_media_type: String,
}

impl ArtifactRow {
    /// Only untagged artifacts are read, so tags stay empty
    fn into_domain(self) -> Result<Artifact, CatalogError> {
        Ok(Artifact {
            id: self.id,
            project_id: self.project_id,
            repository_name: self.repository_name,
            digest: Digest::parse(self.digest)?,
            media_type: self.media_type,
            manifest_media_type: self.manifest_media_type,
            tags: Vec::new(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct RemovedArtifactRow {
    repository_name: String,
    digest: String,
    media_type: String,
    manifest_media_type: String,
}

#[derive(sqlx::FromRow)]
struct TrashRow {
    id: i64,
    digest: String,
    repository_name: String,
    media_type: String,
    manifest_media_type: String,
    creation_time: DateTime<Utc>,
}

impl TrashRow {
    fn into_domain(self) -> Result<TrashEntry, CatalogError> {
        Ok(TrashEntry {
            id: self.id,
            digest: Digest::parse(self.digest)?,
            repository_name: self.repository_name,
            media_type: self.media_type,
            manifest_media_type: self.manifest_media_type,
            creation_time: self.creation_time,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BlobRow {
    id: i64,
    digest: String,
    content_type: String,
    size: i64,
    status: String,
    version: i64,
    update_time: DateTime<Utc>,
}

impl BlobRow {
    fn into_domain(self) -> Result<Blob, CatalogError> {
        let status = self
            .status
            .parse::<BlobStatus>()
            .map_err(DomainError::InvalidStatus)?;

        Ok(Blob::reconstruct(
            self.id,
            Digest::parse(self.digest)?,
            self.content_type,
            self.size,
            status,
            self.version,
            self.update_time,
        ))
    }
}
