//! Saving generated audio to disk.

use crate::api::{transport_error, ApiError};
use crate::error::{LecternError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use url::Url;

/// Filename used when the backend did not name the asset.
pub const FALLBACK_FILENAME: &str = "audio.mp3";

/// Where a piece of audio lives and what to call it locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub filename: String,
}

impl DownloadRequest {
    /// `filename` falls back to [`FALLBACK_FILENAME`] when absent or blank.
    pub fn new(url: Url, filename: Option<&str>) -> Self {
        let filename = filename
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        Self { url, filename }
    }

    /// Path inside `dir`, ignoring any directory part the backend put in the name.
    pub fn target_in(&self, dir: &Path) -> PathBuf {
        let name = Path::new(&self.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FALLBACK_FILENAME.into());
        dir.join(name)
    }
}

/// Fetch the audio and write it into `dir`, returning the written path.
#[instrument(skip(client, request), fields(url = %request.url))]
pub async fn save(client: &Client, request: &DownloadRequest, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let target = request.target_in(dir);

    info!("Downloading audio to {}", target.display());
    let response = client
        .get(request.url.clone())
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail: None,
        }
        .into());
    }

    let bytes = response.bytes().await.map_err(transport_error)?;
    if bytes.is_empty() {
        return Err(LecternError::Audio("Downloaded audio is empty".to_string()));
    }

    tokio::fs::write(&target, &bytes).await?;
    debug!(bytes = bytes.len(), "Audio saved");
    Ok(target)
}
