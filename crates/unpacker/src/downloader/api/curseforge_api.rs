//! CurseForge API client
//!
//! Resolves mod metadata and streams mod files. Every request carries the
//! `x-api-key` header; transient failures are retried with exponential
//! backoff.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::downloader::api::{ApiKey, ModInfo, ModRepository};
use crate::downloader::config::DownloadConfig;
use crate::downloader::core::http::{build_client, ensure_success, stream_to_file};
use crate::downloader::core::{TaskError, TaskResult};
use crate::error::Result;
use crate::manifest::ModReference;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// `GET /v1/mods/{id}` response envelope
#[derive(Debug, Deserialize)]
struct ModResponse {
    data: ModInfo,
}

/// CurseForge API client
pub struct CurseForgeAPI {
    api_key: ApiKey,
    client: Client,
    config: DownloadConfig,
}

impl std::fmt::Debug for CurseForgeAPI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurseForgeAPI")
            .field("api_base", &self.config.api_base)
            .field("download_base", &self.config.download_base)
            .finish_non_exhaustive()
    }
}

impl CurseForgeAPI {
    pub fn new(api_key: ApiKey, config: &DownloadConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(config)?;
        Ok(Self {
            api_key,
            client,
            config: config.clone(),
        })
    }

    /// Create a client with the API key taken from the environment
    pub fn from_env(config: &DownloadConfig) -> Result<Self> {
        Self::new(ApiKey::from_env()?, config)
    }

    pub fn mod_url(&self, project_id: u32) -> String {
        format!("{}/v1/mods/{}", self.config.api_base, project_id)
    }

    pub fn download_url(&self, reference: &ModReference) -> String {
        format!(
            "{}/mods/{}/files/{}/download",
            self.config.download_base, reference.project_id, reference.file_id
        )
    }

    /// Get mod information
    pub async fn get_mod(&self, project_id: u32) -> TaskResult<ModInfo> {
        let url = self.mod_url(project_id);
        let response = self.send_with_retry(&url, self.config.timeout).await?;

        let body: ModResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                TaskError::InvalidResponse {
                    url: url.clone(),
                    reason: format!("cannot decode mod info: {}", e),
                }
            } else {
                TaskError::network(&url, e)
            }
        })?;

        debug!("Resolved project {} to '{}' ({})", project_id, body.data.name, body.data.slug);
        Ok(body.data)
    }

    /// Start a file download and return the successful response
    pub async fn open_download(&self, reference: &ModReference) -> TaskResult<Response> {
        let url = self.download_url(reference);
        self.send_with_retry(&url, self.config.download_timeout).await
    }

    fn authenticated_request(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.client
            .get(url)
            .timeout(timeout)
            .header(API_KEY_HEADER, self.api_key.expose())
    }

    async fn send_once(&self, url: &str, timeout: Duration) -> TaskResult<Response> {
        let response = self
            .authenticated_request(url, timeout)
            .send()
            .await
            .map_err(|e| TaskError::network(url, e))?;
        ensure_success(url, response)
    }

    async fn send_with_retry(&self, url: &str, timeout: Duration) -> TaskResult<Response> {
        retry(&self.config, url, || self.send_once(url, timeout)).await
    }
}

/// Run `operation` until it succeeds, fails permanently or retries run out
async fn retry<F, Fut, T>(config: &DownloadConfig, url: &str, operation: F) -> TaskResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TaskResult<T>>,
{
    RetryIf::spawn(config.retry_delays(), operation, |e: &TaskError| {
        let retry = e.is_retryable();
        if retry {
            warn!("Retrying {} after error: {}", url, e);
        }
        retry
    })
    .await
}

#[async_trait]
impl ModRepository for CurseForgeAPI {
    async fn resolve_mod(&self, reference: &ModReference) -> TaskResult<ModInfo> {
        self.get_mod(reference.project_id).await
    }

    async fn download_file(&self, reference: &ModReference, dest_path: &Path) -> TaskResult<u64> {
        let url = self.download_url(reference);
        let response = self.open_download(reference).await?;
        stream_to_file(&url, response, dest_path).await
    }
}
