//! Video download for URL-based tracking requests
//!
//! Downloaded files live in temporary locations and are cleaned up when
//! the `DownloadedFile` is dropped.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use visiotrack_common::{PipelineError, Result};

/// A downloaded file that is removed when dropped
pub struct DownloadedFile {
    path: PathBuf,
    _temp_file: NamedTempFile,
}

impl DownloadedFile {
    fn from_temp_file(temp_file: NamedTempFile) -> Self {
        let path = temp_file.path().to_path_buf();
        Self {
            path,
            _temp_file: temp_file,
        }
    }

    /// Path of the downloaded file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for DownloadedFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Download a video from an HTTP/HTTPS URL into a temporary file.
///
/// # Errors
///
/// Returns `UnsupportedUpload` for bad URLs or non-video responses,
/// `SourceRead` when the transfer fails.
pub async fn download_from_url(url: &str) -> Result<DownloadedFile> {
    info!("Downloading video from URL: {}", url);

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(PipelineError::UnsupportedUpload(
            "Only http:// and https:// URLs are supported".to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()
        .map_err(|e| PipelineError::SourceRead(format!("Failed to create HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::SourceRead(format!("Failed to download video: {e}")))?;

    if !response.status().is_success() {
        return Err(PipelineError::SourceRead(format!(
            "Download failed with status: {}",
            response.status()
        )));
    }

    let extension = infer_extension(url, response.headers().get("content-type"));

    let temp_file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .map_err(PipelineError::Io)?;

    let temp_path = temp_file.path().to_path_buf();
    debug!("Writing download to {}", temp_path.display());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PipelineError::SourceRead(format!("Failed to read response body: {e}")))?;

    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .map_err(PipelineError::Io)?;
    file.write_all(&bytes).await.map_err(PipelineError::Io)?;
    file.flush().await.map_err(PipelineError::Io)?;

    info!(
        "Downloaded {} bytes to {}",
        bytes.len(),
        temp_path.display()
    );

    Ok(DownloadedFile::from_temp_file(temp_file))
}

/// Best-effort container extension from the URL path or content type.
fn infer_extension(url: &str, content_type: Option<&reqwest::header::HeaderValue>) -> String {
    if let Some(ext) = extension_from_url(url) {
        return ext.to_string();
    }

    if let Some(ext) = content_type
        .and_then(|ct| ct.to_str().ok())
        .and_then(extension_from_content_type)
    {
        return ext.to_string();
    }

    "mp4".to_string()
}

fn extension_from_url(url: &str) -> Option<&str> {
    let path = url.split('?').next()?;
    let filename = path.split('/').next_back()?;
    if !filename.contains('.') {
        return None;
    }

    let extension = filename.split('.').next_back()?;
    if extension.len() <= 5 && extension.chars().all(char::is_alphanumeric) {
        Some(extension)
    } else {
        None
    }
}

fn extension_from_content_type(content_type: &str) -> Option<&str> {
    let mime_type = content_type.split(';').next()?.trim();
    match mime_type {
        "video/mp4" => Some("mp4"),
        "video/mpeg" => Some("mpeg"),
        "video/quicktime" => Some("mov"),
        "video/x-msvideo" => Some("avi"),
        "video/x-matroska" => Some("mkv"),
        "video/webm" => Some("webm"),
        _ => None,
    }
}
