//! HTTP utilities
//!
//! Client construction from [`DownloadConfig`] and streaming of a response
//! body into a file on disk.

use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::downloader::config::DownloadConfig;
use crate::downloader::core::{FileOperation, TaskError, TaskResult};
use crate::error::UnpackError;

/// Build the shared HTTP client from download configuration
///
/// No client-wide deadline is set: metadata calls and file downloads each
/// apply their own per-request timeout.
pub fn build_client(config: &DownloadConfig) -> Result<Client, UnpackError> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| {
            UnpackError::configuration(
                format!("Failed to create HTTP client: {}", e),
                "http_client",
                "Check TLS support and proxy settings",
            )
        })
}

/// Turn a non-success response into a status error
pub fn ensure_success(url: &str, response: Response) -> TaskResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TaskError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Stream a response body to `dest_path`, truncating any existing file
///
/// The file handle and the response are both dropped before this returns.
/// A partially written file is removed on failure.
pub async fn stream_to_file(url: &str, response: Response, dest_path: &Path) -> TaskResult<u64> {
    debug!("Stream downloading: {} to {}", url, dest_path.display());

    let mut file = fs::File::create(dest_path)
        .await
        .map_err(|e| TaskError::file_system(dest_path, FileOperation::Create, e))?;

    let written = match copy_body(url, response, &mut file, dest_path).await {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            remove_partial(dest_path).await;
            return Err(e);
        }
    };

    debug!("Stream download completed: {} bytes", written);
    Ok(written)
}

async fn copy_body(
    url: &str,
    response: Response,
    file: &mut fs::File,
    dest_path: &Path,
) -> TaskResult<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TaskError::network(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| TaskError::file_system(dest_path, FileOperation::Write, e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| TaskError::file_system(dest_path, FileOperation::Write, e))?;

    Ok(written)
}

/// Best-effort removal of a file left behind by a failed or aborted write
pub async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {}: {}", path.display(), e),
    }
}
