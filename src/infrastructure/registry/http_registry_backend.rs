use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::retry::RetryPolicy;
use crate::application::ports::{BackendError, RegistryBackend};
use crate::domain::value_objects::Digest;

/// HTTP client for the registry controller that fronts backend storage
pub struct HttpRegistryBackend {
    base_url: String,
    http: reqwest::Client,
    manifest_retry: RetryPolicy,
}

impl HttpRegistryBackend {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
        manifest_retry: RetryPolicy,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::Fatal {
                status: None,
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            manifest_retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn delete(&self, url: &str) -> Result<(), BackendError> {
        debug!("DELETE {}", url);
        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, url, body))
    }
}

#[async_trait]
impl RegistryBackend for HttpRegistryBackend {
    async fn health(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Unreachable(format!(
                "health check returned {}",
                resp.status()
            )))
        }
    }

    async fn delete_manifest(&self, repository: &str, digest: &Digest) -> Result<(), BackendError> {
        let url = format!("{}/manifests/{}/{}", self.base_url, repository, digest);
        self.manifest_retry
            .run("delete_manifest", || self.delete(&url))
            .await
    }

    async fn delete_blob(&self, digest: &Digest) -> Result<(), BackendError> {
        let url = format!("{}/blobs/{}", self.base_url, digest);
        self.delete(&url).await
    }
}

/// Connection failures and timeouts may clear up on their own
fn transport_error(e: reqwest::Error) -> BackendError {
    BackendError::Transient {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// 404 is NotFound, 5xx and 429 are transient, any other status is fatal
fn status_error(status: StatusCode, url: &str, body: String) -> BackendError {
    let message = if body.is_empty() {
        format!("{} returned {}", url, status)
    } else {
        format!("{} returned {}: {}", url, status, body.trim())
    };

    if status == StatusCode::NOT_FOUND {
        BackendError::NotFound(url.to_string())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::Transient {
            status: Some(status.as_u16()),
            message,
        }
    } else {
        BackendError::Fatal {
            status: Some(status.as_u16()),
            message,
        }
    }
}
