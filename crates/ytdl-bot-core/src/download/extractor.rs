//! Extraction collaborator seam.
//!
//! The workflow talks to the media extractor through [`MediaExtractor`] and
//! an explicit [`ExtractionRequest`]; nothing relies on process-wide defaults.

use crate::config::{
    EXTRACTION_CHUNK_SIZE_BYTES, EXTRACTION_RETRIES, EXTRACTION_SOCKET_TIMEOUT_SECS,
    OUTPUT_TEMPLATE,
};
use crate::formats::ExtractionPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by an extractor
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The extractor ran and reported a download failure
    #[error("{0}")]
    Failed(String),
    /// The extractor did not finish before the deadline
    #[error("Download timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The extractor could not be started
    #[error("Failed to start extractor: {0}")]
    Spawn(#[source] std::io::Error),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The extractor printed metadata that could not be parsed
    #[error("Invalid extractor output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything the extractor needs for one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Link to download
    pub url: String,
    /// Format selector expression
    pub format_selector: String,
    /// Directory the file must land in
    pub workspace: PathBuf,
    /// Output file template inside `workspace`
    pub output_template: PathBuf,
    /// Attempts on transient network failures
    pub retries: u32,
    /// Socket-level timeout
    pub socket_timeout: Duration,
    /// HTTP chunk size in bytes
    pub chunk_size: u64,
    /// Restrict file names to a safe ASCII subset
    pub restrict_filenames: bool,
    /// Never expand playlists
    pub no_playlist: bool,
    /// Container to merge separate streams into
    pub merge_output_format: Option<&'static str>,
    /// Codec to convert extracted audio into
    pub extract_audio_codec: Option<&'static str>,
}

impl ExtractionRequest {
    /// Builds the request for `url` under `policy`, writing into `workspace`
    #[must_use]
    pub fn new(url: &str, policy: &ExtractionPolicy, workspace: &Path) -> Self {
        Self {
            url: url.to_string(),
            format_selector: policy.format_selector(),
            workspace: workspace.to_path_buf(),
            output_template: workspace.join(OUTPUT_TEMPLATE),
            retries: EXTRACTION_RETRIES,
            socket_timeout: Duration::from_secs(EXTRACTION_SOCKET_TIMEOUT_SECS),
            chunk_size: EXTRACTION_CHUNK_SIZE_BYTES,
            restrict_filenames: true,
            no_playlist: true,
            merge_output_format: policy.merge_output_format(),
            extract_audio_codec: policy.extract_audio_codec(),
        }
    }
}

/// Metadata of a finished download
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedMedia {
    /// Final path after post-processing
    #[serde(default)]
    pub filepath: Option<PathBuf>,
    /// Path the extractor planned before post-processing
    #[serde(default, rename = "_filename")]
    pub filename: Option<PathBuf>,
    /// Media title
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Frame width
    #[serde(default)]
    pub width: Option<u32>,
    /// Frame height
    #[serde(default)]
    pub height: Option<u32>,
    /// Channel or uploader name
    #[serde(default)]
    pub uploader: Option<String>,
}

impl ExtractedMedia {
    /// Best path the extractor reported for the produced file
    #[must_use]
    pub fn reported_path(&self) -> Option<&Path> {
        self.filepath.as_deref().or(self.filename.as_deref())
    }

    /// Duration rounded to whole seconds, 0 when unknown
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_secs(&self) -> u32 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map_or(0, |d| d.round().min(f64::from(u32::MAX)) as u32)
    }
}

/// Resolves a link into a downloaded file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Download `request.url` into `request.workspace`
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractedMedia, ExtractionError>;
}
