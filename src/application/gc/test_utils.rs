//! In-memory collaborators for collector tests.
//!
//! All fakes append to one shared [`EventLog`] so tests can assert the
//! relative order of catalog, backend and cache side effects.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::gc::config::GcConfig;
use crate::application::gc::worker::GarbageCollector;
use crate::application::ports::{
    BackendError, CacheConnector, CacheError, Catalog, CatalogError, JobContext, RegistryBackend,
    RegistryCache,
};
use crate::domain::entities::{Artifact, Blob, Project, TrashEntry};
use crate::domain::value_objects::{
    BlobStatus, Digest, MEDIA_TYPE_DOCKER_FOREIGN_LAYER, MEDIA_TYPE_DOCKER_LAYER,
    MEDIA_TYPE_DOCKER_MANIFEST,
};

/// Side effect observed by a fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DeleteArtifact(i64),
    CleanupAssociations(i64),
    MarkStatus { blob_id: i64, to: BlobStatus },
    DeleteManifest { repository: String, digest: String },
    CleanupArtifactLinks(String),
    DeleteBlob(String),
    DeleteBlobRecord(i64),
    FlushTrash(u32),
    CacheDelete(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn backend_calls(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::DeleteManifest { .. } | Event::DeleteBlob(_)))
            .collect()
    }
}

pub fn digest(seed: char) -> Digest {
    Digest::parse(format!("sha256:{}", seed.to_string().repeat(64))).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(hours)
}

pub fn blob_with(id: i64, seed: char, content_type: &str, size: i64, hours_old: i64) -> Blob {
    Blob::reconstruct(
        id,
        digest(seed),
        content_type.to_string(),
        size,
        BlobStatus::None,
        0,
        hours_ago(hours_old),
    )
}

pub fn layer_blob(id: i64, seed: char, size: i64, hours_old: i64) -> Blob {
    blob_with(id, seed, MEDIA_TYPE_DOCKER_LAYER, size, hours_old)
}

pub fn manifest_blob(id: i64, seed: char, size: i64, hours_old: i64) -> Blob {
    blob_with(id, seed, MEDIA_TYPE_DOCKER_MANIFEST, size, hours_old)
}

pub fn foreign_layer_blob(id: i64, seed: char, size: i64, hours_old: i64) -> Blob {
    blob_with(id, seed, MEDIA_TYPE_DOCKER_FOREIGN_LAYER, size, hours_old)
}

pub fn trash_entry(id: i64, seed: char, repository: &str) -> TrashEntry {
    TrashEntry {
        id,
        digest: digest(seed),
        repository_name: repository.to_string(),
        media_type: "application/vnd.oci.image.config.v1+json".to_string(),
        manifest_media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
        creation_time: hours_ago(24),
    }
}

pub fn artifact(id: i64, project_id: i64, repository: &str, seed: char, tags: &[&str]) -> Artifact {
    Artifact {
        id,
        project_id,
        repository_name: repository.to_string(),
        digest: digest(seed),
        media_type: "application/vnd.oci.image.config.v1+json".to_string(),
        manifest_media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Catalog over plain vectors, with knobs to inject races and failures
pub struct FakeCatalog {
    pub events: EventLog,
    pub projects: Mutex<Vec<Project>>,
    pub artifacts: Mutex<Vec<Artifact>>,
    pub trash: Mutex<Vec<TrashEntry>>,
    pub blobs: Mutex<Vec<Blob>>,
    /// (project id, blob id)
    pub associations: Mutex<Vec<(i64, i64)>>,
    /// (artifact digest, blob id)
    pub artifact_blobs: Mutex<Vec<(Digest, i64)>>,
    /// Blobs a concurrent push revives right before the mark write
    pub race_on_mark: Mutex<HashSet<i64>>,
    /// Blobs a concurrent push revives right before the deleting write
    pub race_on_sweep: Mutex<HashSet<i64>>,
    pub fail_delete_artifact: Mutex<HashSet<i64>>,
    pub fail_delete_record: Mutex<HashSet<i64>>,
    pub fail_mark: Mutex<HashSet<i64>>,
    pub fail_list_untagged: AtomicBool,
    pub fail_select: AtomicBool,
    pub fail_flush: AtomicBool,
    pub fail_released_by: AtomicBool,
    next_trash_id: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            projects: Mutex::new(Vec::new()),
            artifacts: Mutex::new(Vec::new()),
            trash: Mutex::new(Vec::new()),
            blobs: Mutex::new(Vec::new()),
            associations: Mutex::new(Vec::new()),
            artifact_blobs: Mutex::new(Vec::new()),
            race_on_mark: Mutex::new(HashSet::new()),
            race_on_sweep: Mutex::new(HashSet::new()),
            fail_delete_artifact: Mutex::new(HashSet::new()),
            fail_delete_record: Mutex::new(HashSet::new()),
            fail_mark: Mutex::new(HashSet::new()),
            fail_list_untagged: AtomicBool::new(false),
            fail_select: AtomicBool::new(false),
            fail_flush: AtomicBool::new(false),
            fail_released_by: AtomicBool::new(false),
            next_trash_id: AtomicUsize::new(1000),
        }
    }

    pub fn with_blobs(self, blobs: Vec<Blob>) -> Self {
        *self.blobs.lock().unwrap() = blobs;
        self
    }

    pub fn with_trash(self, entries: Vec<TrashEntry>) -> Self {
        *self.trash.lock().unwrap() = entries;
        self
    }

    pub fn with_projects(self, ids: &[i64]) -> Self {
        *self.projects.lock().unwrap() = ids
            .iter()
            .map(|id| Project {
                id: *id,
                name: format!("project-{}", id),
            })
            .collect();
        self
    }

    pub fn with_artifacts(self, artifacts: Vec<Artifact>) -> Self {
        *self.artifacts.lock().unwrap() = artifacts;
        self
    }

    pub fn with_associations(self, associations: Vec<(i64, i64)>) -> Self {
        *self.associations.lock().unwrap() = associations;
        self
    }

    pub fn with_artifact_blobs(self, links: Vec<(Digest, i64)>) -> Self {
        *self.artifact_blobs.lock().unwrap() = links;
        self
    }

    pub fn blob(&self, id: i64) -> Option<Blob> {
        self.blobs.lock().unwrap().iter().find(|b| b.id() == id).cloned()
    }

    pub fn blob_ids(&self) -> Vec<i64> {
        self.blobs.lock().unwrap().iter().map(|b| b.id()).collect()
    }

    pub fn trash_len(&self) -> usize {
        self.trash.lock().unwrap().len()
    }

    /// Simulate a push touching the blob: live again, new version
    fn revive(&self, blob_id: i64) {
        let mut blobs = self.blobs.lock().unwrap();
        if let Some(row) = blobs.iter_mut().find(|b| b.id() == blob_id) {
            *row = Blob::reconstruct(
                row.id(),
                row.digest().clone(),
                row.content_type().to_string(),
                row.size(),
                BlobStatus::None,
                row.version() + 1,
                Utc::now(),
            );
        }
    }

    fn referenced_in_project(&self, project_id: i64, blob_id: i64) -> bool {
        let artifacts = self.artifacts.lock().unwrap();
        let links = self.artifact_blobs.lock().unwrap();
        artifacts
            .iter()
            .filter(|a| a.project_id == project_id)
            .any(|a| links.iter().any(|(d, id)| *d == a.digest && *id == blob_id))
    }

    fn stale_associations(&self, project_id: i64, as_of: DateTime<Utc>) -> Vec<i64> {
        let associations = self.associations.lock().unwrap().clone();
        let blobs = self.blobs.lock().unwrap().clone();
        associations
            .into_iter()
            .filter(|(p, _)| *p == project_id)
            .map(|(_, b)| b)
            .filter(|b| !self.referenced_in_project(project_id, *b))
            .filter(|b| {
                blobs
                    .iter()
                    .find(|row| row.id() == *b)
                    .map(|row| row.update_time() <= as_of)
                    .unwrap_or(false)
            })
            .collect()
    }
}

fn window_cutoff(time_window_hours: u32) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(time_window_hours as i64)
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_projects(
        &self,
        after_id: i64,
        page_size: i64,
    ) -> Result<Vec<Project>, CatalogError> {
        let mut projects: Vec<Project> = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.id > after_id)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.id);
        projects.truncate(page_size as usize);
        Ok(projects)
    }

    async fn list_untagged_artifacts(&self) -> Result<Vec<Artifact>, CatalogError> {
        if self.fail_list_untagged.load(Ordering::SeqCst) {
            return Err(CatalogError::Internal("artifact listing failed".to_string()));
        }
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_untagged())
            .cloned()
            .collect())
    }

    async fn delete_artifact(&self, id: i64) -> Result<TrashEntry, CatalogError> {
        if self.fail_delete_artifact.lock().unwrap().contains(&id) {
            return Err(CatalogError::Internal(format!("cannot delete artifact {}", id)));
        }
        let mut artifacts = self.artifacts.lock().unwrap();
        let index = artifacts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CatalogError::NotFound(format!("artifact {}", id)))?;
        let removed = artifacts.remove(index);
        drop(artifacts);

        let entry = TrashEntry {
            id: self.next_trash_id.fetch_add(1, Ordering::SeqCst) as i64,
            digest: removed.digest,
            repository_name: removed.repository_name,
            media_type: removed.media_type,
            manifest_media_type: removed.manifest_media_type,
            creation_time: Utc::now(),
        };
        self.trash.lock().unwrap().push(entry.clone());
        self.events.push(Event::DeleteArtifact(id));
        Ok(entry)
    }

    async fn list_trash(&self, time_window_hours: u32) -> Result<Vec<TrashEntry>, CatalogError> {
        let cutoff = window_cutoff(time_window_hours);
        Ok(self
            .trash
            .lock()
            .unwrap()
            .iter()
            .filter(|t| time_window_hours == 0 || t.creation_time <= cutoff)
            .cloned()
            .collect())
    }

    async fn flush_trash(&self, time_window_hours: u32) -> Result<u64, CatalogError> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(CatalogError::Internal("flush failed".to_string()));
        }
        let cutoff = window_cutoff(time_window_hours);
        let mut trash = self.trash.lock().unwrap();
        let before = trash.len();
        trash.retain(|t| !(time_window_hours == 0 || t.creation_time <= cutoff));
        self.events.push(Event::FlushTrash(time_window_hours));
        Ok((before - trash.len()) as u64)
    }

    async fn cleanup_project_associations(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<u64, CatalogError> {
        let stale = self.stale_associations(project_id, as_of);
        self.associations
            .lock()
            .unwrap()
            .retain(|(p, b)| !(*p == project_id && stale.contains(b)));
        self.events.push(Event::CleanupAssociations(project_id));
        Ok(stale.len() as u64)
    }

    async fn find_unassociated_blobs(
        &self,
        project_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError> {
        let stale = self.stale_associations(project_id, as_of);
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .filter(|b| stale.contains(&b.id()))
            .cloned()
            .collect())
    }

    async fn select_useless_blobs(
        &self,
        time_window_hours: u32,
    ) -> Result<Vec<Blob>, CatalogError> {
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(CatalogError::Internal("candidate query failed".to_string()));
        }
        let cutoff = window_cutoff(time_window_hours);
        let associated: HashSet<i64> = self
            .associations
            .lock()
            .unwrap()
            .iter()
            .map(|(_, b)| *b)
            .collect();
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .filter(|b| !associated.contains(&b.id()))
            .filter(|b| b.update_time() <= cutoff)
            .cloned()
            .collect())
    }

    async fn blobs_released_by(
        &self,
        artifact_ids: &[i64],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Blob>, CatalogError> {
        if self.fail_released_by.load(Ordering::SeqCst) {
            return Err(CatalogError::Internal("artifact blob lookup failed".to_string()));
        }
        let artifacts = self.artifacts.lock().unwrap().clone();
        let links = self.artifact_blobs.lock().unwrap().clone();
        let references = |a: &Artifact, blob: &Blob| {
            a.digest == *blob.digest()
                || links.iter().any(|(d, id)| *d == a.digest && *id == blob.id())
        };
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.update_time() <= as_of)
            .filter(|b| {
                artifacts
                    .iter()
                    .any(|a| artifact_ids.contains(&a.id) && references(a, *b))
            })
            .filter(|b| {
                !artifacts
                    .iter()
                    .any(|a| !artifact_ids.contains(&a.id) && references(a, *b))
            })
            .cloned()
            .collect())
    }

    async fn update_blob_status(&self, blob: &Blob, to: BlobStatus) -> Result<u64, CatalogError> {
        if to == BlobStatus::Delete && self.fail_mark.lock().unwrap().contains(&blob.id()) {
            return Err(CatalogError::Internal("status write failed".to_string()));
        }
        let raced = match to {
            BlobStatus::Delete => self.race_on_mark.lock().unwrap().remove(&blob.id()),
            BlobStatus::Deleting => self.race_on_sweep.lock().unwrap().remove(&blob.id()),
            _ => false,
        };
        if raced {
            self.revive(blob.id());
        }

        let mut blobs = self.blobs.lock().unwrap();
        let Some(row) = blobs.iter_mut().find(|b| b.id() == blob.id()) else {
            return Ok(0);
        };
        if row.status() != blob.status()
            || row.version() != blob.version()
            || !row.status().can_transition_to(to)
        {
            return Ok(0);
        }
        row.apply_transition(to)?;
        self.events.push(Event::MarkStatus {
            blob_id: blob.id(),
            to,
        });
        Ok(1)
    }

    async fn delete_blob_record(&self, blob_id: i64) -> Result<(), CatalogError> {
        if self.fail_delete_record.lock().unwrap().contains(&blob_id) {
            return Err(CatalogError::Internal(format!(
                "cannot delete blob record {}",
                blob_id
            )));
        }
        let mut blobs = self.blobs.lock().unwrap();
        let before = blobs.len();
        blobs.retain(|b| b.id() != blob_id);
        if blobs.len() == before {
            return Err(CatalogError::NotFound(format!("blob {}", blob_id)));
        }
        self.events.push(Event::DeleteBlobRecord(blob_id));
        Ok(())
    }

    async fn cleanup_artifact_links(&self, artifact_digest: &Digest) -> Result<u64, CatalogError> {
        let in_use = self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .any(|a| &a.digest == artifact_digest);
        self.events
            .push(Event::CleanupArtifactLinks(artifact_digest.to_string()));
        if in_use {
            return Ok(0);
        }
        let mut links = self.artifact_blobs.lock().unwrap();
        let before = links.len();
        links.retain(|(d, _)| d != artifact_digest);
        Ok((before - links.len()) as u64)
    }
}

/// Backend whose responses are scripted per digest
pub struct FakeBackend {
    pub events: EventLog,
    pub healthy: AtomicBool,
    pub manifest_failures: Mutex<HashMap<String, BackendError>>,
    pub blob_failures: Mutex<HashMap<String, BackendError>>,
    /// Transient manifest failures left per digest before deletes succeed
    pub manifest_flakes: Mutex<HashMap<String, usize>>,
    pub manifest_attempts: AtomicUsize,
}

impl FakeBackend {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            healthy: AtomicBool::new(true),
            manifest_failures: Mutex::new(HashMap::new()),
            blob_failures: Mutex::new(HashMap::new()),
            manifest_flakes: Mutex::new(HashMap::new()),
            manifest_attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_unhealthy(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    pub fn fail_manifest(&self, digest: &Digest, error: BackendError) {
        self.manifest_failures
            .lock()
            .unwrap()
            .insert(digest.to_string(), error);
    }

    /// The next `times` manifest deletes of `digest` answer 503
    pub fn flaky_manifest(&self, digest: &Digest, times: usize) {
        self.manifest_flakes
            .lock()
            .unwrap()
            .insert(digest.to_string(), times);
    }

    pub fn fail_blob(&self, digest: &Digest, error: BackendError) {
        self.blob_failures
            .lock()
            .unwrap()
            .insert(digest.to_string(), error);
    }
}

#[async_trait]
impl RegistryBackend for FakeBackend {
    async fn health(&self) -> Result<(), BackendError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unreachable("connection refused".to_string()))
        }
    }

    async fn delete_manifest(&self, repository: &str, digest: &Digest) -> Result<(), BackendError> {
        self.manifest_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(left) = self.manifest_flakes.lock().unwrap().get_mut(digest.as_str()) {
            if *left > 0 {
                *left -= 1;
                return Err(BackendError::Transient {
                    status: Some(503),
                    message: "service unavailable".to_string(),
                });
            }
        }
        if let Some(error) = self.manifest_failures.lock().unwrap().get(digest.as_str()) {
            return Err(error.clone());
        }
        self.events.push(Event::DeleteManifest {
            repository: repository.to_string(),
            digest: digest.to_string(),
        });
        Ok(())
    }

    async fn delete_blob(&self, digest: &Digest) -> Result<(), BackendError> {
        if let Some(error) = self.blob_failures.lock().unwrap().get(digest.as_str()) {
            return Err(error.clone());
        }
        self.events.push(Event::DeleteBlob(digest.to_string()));
        Ok(())
    }
}

fn glob_to_regex(pattern: &str) -> Regex {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", escaped)).unwrap()
}

/// Key space shared by every session a [`FakeCacheConnector`] opens
pub struct FakeCacheConnector {
    pub events: EventLog,
    pub keys: Arc<Mutex<BTreeSet<String>>>,
    pub fail_connect: AtomicBool,
    pub fail_scan: AtomicBool,
    pub connections: AtomicUsize,
}

impl FakeCacheConnector {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            keys: Arc::new(Mutex::new(BTreeSet::new())),
            fail_connect: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn with_keys(self, keys: &[&str]) -> Self {
        self.keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn remaining_keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl CacheConnector for FakeCacheConnector {
    async fn connect(&self, _endpoint: &str) -> Result<Box<dyn RegistryCache>, CacheError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection refused".to_string()));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCache {
            events: self.events.clone(),
            keys: Arc::clone(&self.keys),
            fail_scan: self.fail_scan.load(Ordering::SeqCst),
            scan_order: Vec::new(),
        }))
    }
}

struct FakeCache {
    events: EventLog,
    keys: Arc<Mutex<BTreeSet<String>>>,
    fail_scan: bool,
    /// Key order fixed when a scan starts at cursor 0
    scan_order: Vec<String>,
}

#[async_trait]
impl RegistryCache for FakeCache {
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        if self.fail_scan {
            return Err(CacheError::Command("SCAN failed".to_string()));
        }
        let matcher = glob_to_regex(pattern);
        let store = self.keys.lock().unwrap();
        if cursor == 0 {
            self.scan_order = store.iter().cloned().collect();
        }
        let start = cursor as usize;
        let end = (start + count).min(self.scan_order.len());
        let page = self
            .scan_order
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .filter(|k| store.contains(*k) && matcher.is_match(k))
            .cloned()
            .collect();
        let next = if end >= self.scan_order.len() {
            0
        } else {
            end as u64
        };
        Ok((next, page))
    }

    async fn delete(&mut self, keys: &[String]) -> Result<u64, CacheError> {
        let mut store = self.keys.lock().unwrap();
        let removed = keys.iter().filter(|k| store.remove(*k)).count();
        self.events.push(Event::CacheDelete(keys.to_vec()));
        Ok(removed as u64)
    }
}

/// Job context with a scripted stop signal
pub struct FakeJobContext {
    stop: AtomicBool,
    stop_after_checks: Option<usize>,
    checks: AtomicUsize,
    pub checkins: Mutex<Vec<String>>,
    values: HashMap<String, Value>,
}

impl FakeJobContext {
    pub fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            stop_after_checks: None,
            checks: AtomicUsize::new(0),
            checkins: Mutex::new(Vec::new()),
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Stop requested before the run starts
    pub fn stopped(self) -> Self {
        self.stop.store(true, Ordering::SeqCst);
        self
    }

    /// The first `checks` polls see no stop, every later one does
    pub fn stop_after(mut self, checks: usize) -> Self {
        self.stop_after_checks = Some(checks);
        self
    }

    pub fn last_checkin(&self) -> Option<Value> {
        self.checkins
            .lock()
            .unwrap()
            .last()
            .map(|raw| serde_json::from_str(raw).unwrap())
    }
}

impl JobContext for FakeJobContext {
    fn stop_requested(&self) -> bool {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        self.stop.load(Ordering::SeqCst)
            || self.stop_after_checks.map(|n| seen >= n).unwrap_or(false)
    }

    fn checkin(&self, progress: &str) {
        self.checkins.lock().unwrap().push(progress.to_string());
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// Fakes wired to one event log
pub struct TestHarness {
    pub events: EventLog,
    pub catalog: Arc<FakeCatalog>,
    pub backend: Arc<FakeBackend>,
    pub cache: Arc<FakeCacheConnector>,
}

impl TestHarness {
    pub fn new(configure: impl FnOnce(FakeCatalog) -> FakeCatalog) -> Self {
        let events = EventLog::default();
        Self {
            catalog: Arc::new(configure(FakeCatalog::new(events.clone()))),
            backend: Arc::new(FakeBackend::new(events.clone())),
            cache: Arc::new(
                FakeCacheConnector::new(events.clone())
                    .with_keys(&["blobs::sha256:aa", "repository::library/nginx", "other"]),
            ),
            events,
        }
    }

    pub fn collector(&self) -> GarbageCollector {
        GarbageCollector::new(
            Arc::clone(&self.catalog) as Arc<dyn Catalog>,
            Arc::clone(&self.backend) as Arc<dyn RegistryBackend>,
            Arc::clone(&self.cache) as Arc<dyn CacheConnector>,
            GcConfig::new(2, 2),
        )
    }
}

/// Parameters of a live run against the fake cache
pub fn live_params(time_window_hours: u32) -> crate::application::gc::params::JobParameters {
    serde_json::json!({
        "delete_untagged": true,
        "time_window_hours": time_window_hours,
        "dry_run": false,
        "cache_endpoint": "redis://redis:6379/1",
    })
    .as_object()
    .cloned()
    .unwrap()
}
