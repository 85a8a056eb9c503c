//! Download-and-deliver workflow.
//!
//! A request runs inside its own temporary workspace. The workspace guard
//! lives inside [`DownloadResult`], so it is removed once the result is
//! dropped, whichever way the request ends.

/// Extraction collaborator seam.
pub mod extractor;
/// Workspace-scoped download orchestration.
pub mod workflow;
/// yt-dlp subprocess adapter.
pub mod ytdlp;

pub use extractor::{ExtractedMedia, ExtractionError, ExtractionRequest, MediaExtractor};
pub use workflow::{DownloadWorkflow, MediaDelivery};
pub use ytdlp::YtDlpExtractor;

#[cfg(test)]
pub use extractor::MockMediaExtractor;
#[cfg(test)]
pub use workflow::MockMediaDelivery;

use crate::formats::FormatKey;
use crate::utils::bytes_to_mb;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Errors surfaced by a download request
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Submitted text is not a supported link
    #[error("Unsupported link")]
    InvalidLink,
    /// A format was chosen but no link is pending for the conversation
    #[error("No pending link for this conversation")]
    NoPendingRequest,
    /// The extractor reported a failure
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    /// The downloaded file exceeds the upload ceiling (size in MB)
    #[error("File too large: {0:.1}MB")]
    TooLarge(f64),
    /// Any other fault
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl DownloadError {
    /// Whether the failure points at a missing remux tool (ffmpeg)
    #[must_use]
    pub fn needs_remux_tool(&self) -> bool {
        match self {
            Self::ExtractionFailed(message) => message.to_lowercase().contains("ffmpeg"),
            _ => false,
        }
    }
}

impl From<ExtractionError> for DownloadError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Failed(message) => Self::ExtractionFailed(message),
            timeout @ ExtractionError::Timeout(_) => Self::ExtractionFailed(timeout.to_string()),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

/// A downloaded file ready for delivery.
///
/// Owns the workspace it lives in; dropping the result deletes both.
#[derive(Debug)]
pub struct DownloadResult {
    /// Format the file was downloaded in
    pub key: FormatKey,
    /// Absolute or workspace-relative path of the file
    pub file_path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Media title
    pub title: String,
    /// Duration in whole seconds, 0 when unknown
    pub duration_seconds: u32,
    /// Frame width for video
    pub width: Option<u32>,
    /// Frame height for video
    pub height: Option<u32>,
    /// Channel or uploader name
    pub uploader: Option<String>,
    workspace: TempDir,
}

impl DownloadResult {
    /// File size in megabytes
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }

    /// Directory holding the file; removed on drop
    #[must_use]
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Summary that outlives the workspace
    #[must_use]
    pub fn summary(&self) -> DownloadSummary {
        DownloadSummary {
            key: self.key,
            title: self.title.clone(),
            size_bytes: self.size_bytes,
        }
    }
}

/// What was delivered, kept after the workspace is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Delivered format
    pub key: FormatKey,
    /// Media title
    pub title: String,
    /// Delivered size in bytes
    pub size_bytes: u64,
}
