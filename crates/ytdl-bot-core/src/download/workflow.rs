//! Download workflow: workspace → extraction → size gate → delivery.

use super::extractor::{ExtractedMedia, ExtractionRequest, MediaExtractor};
use super::ytdlp::YtDlpExtractor;
use super::{DownloadError, DownloadResult, DownloadSummary};
use crate::config::{DownloaderSettings, MAX_UPLOAD_SIZE_BYTES, WORKSPACE_PREFIX};
use crate::formats::{ExtractionPolicy, FormatKey};
use crate::utils::bytes_to_mb;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

/// Hands a finished download to the user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDelivery: Send + Sync {
    /// Deliver the file referenced by `media`.
    ///
    /// The file exists for the whole call.
    async fn deliver(&self, media: &DownloadResult) -> anyhow::Result<()>;
}

/// Runs one download request inside an exclusive workspace
pub struct DownloadWorkflow {
    extractor: Arc<dyn MediaExtractor>,
    workspace_root: PathBuf,
}

impl DownloadWorkflow {
    /// Create a workflow using `extractor`, creating workspaces under `workspace_root`
    #[must_use]
    pub fn new(extractor: Arc<dyn MediaExtractor>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            workspace_root: workspace_root.into(),
        }
    }

    /// Create a yt-dlp backed workflow from settings
    #[must_use]
    pub fn from_settings(settings: &DownloaderSettings) -> Self {
        Self::new(
            Arc::new(YtDlpExtractor::from_settings(settings)),
            settings.workspace_root(),
        )
    }

    /// Download `url` according to `policy`.
    ///
    /// On success the returned [`DownloadResult`] keeps the workspace alive;
    /// on any error the workspace is already gone when this returns.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::ExtractionFailed`] if the extractor reports a failure
    /// - [`DownloadError::TooLarge`] if the file exceeds the size ceiling
    /// - [`DownloadError::Unexpected`] for workspace or file system faults
    #[instrument(skip(self, policy), fields(format = %policy.key))]
    pub async fn run(
        &self,
        url: &str,
        policy: &ExtractionPolicy,
    ) -> Result<DownloadResult, DownloadError> {
        let workspace = self.acquire_workspace().await?;
        debug!(workspace = %workspace.path().display(), "Workspace acquired");

        let request = ExtractionRequest::new(url, policy, workspace.path());
        info!(selector = %request.format_selector, "Starting extraction");

        let media = self.extractor.extract(&request).await?;

        let file_path = resolve_output(workspace.path(), media.reported_path()).await?;
        let size_bytes = tokio::fs::metadata(&file_path)
            .await
            .map_err(|e| DownloadError::Unexpected(format!("Failed to stat download: {e}")))?
            .len();

        if size_bytes > MAX_UPLOAD_SIZE_BYTES {
            let size_mb = bytes_to_mb(size_bytes);
            warn!(size_mb, "Download exceeds upload limit, discarding");
            if let Err(e) = tokio::fs::remove_file(&file_path).await {
                warn!(error = %e, "Failed to remove oversized file");
            }
            return Err(DownloadError::TooLarge(size_mb));
        }

        info!(size_bytes, file = %file_path.display(), "Download ready for delivery");
        Ok(build_result(policy.key, file_path, size_bytes, media, workspace))
    }

    /// Download and deliver in one scope.
    ///
    /// The workspace is removed after `delivery` returns, whether it
    /// succeeded or not.
    ///
    /// # Errors
    ///
    /// Every error of [`Self::run`], plus [`DownloadError::Unexpected`] when
    /// delivery fails.
    pub async fn run_and_deliver(
        &self,
        url: &str,
        policy: &ExtractionPolicy,
        delivery: &dyn MediaDelivery,
    ) -> Result<DownloadSummary, DownloadError> {
        let media = self.run(url, policy).await?;
        let summary = media.summary();

        let delivered = delivery.deliver(&media).await;
        let workspace = media.workspace_path().to_path_buf();
        drop(media);
        debug!(workspace = %workspace.display(), "Workspace released");

        delivered.map_err(|e| {
            warn!(error = %e, "Delivery failed");
            DownloadError::Unexpected(format!("Delivery failed: {e}"))
        })?;
        Ok(summary)
    }

    async fn acquire_workspace(&self) -> Result<TempDir, DownloadError> {
        tokio::fs::create_dir_all(&self.workspace_root)
            .await
            .map_err(|e| DownloadError::Unexpected(format!("Failed to prepare download dir: {e}")))?;

        tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.workspace_root)
            .map_err(|e| DownloadError::Unexpected(format!("Failed to create workspace: {e}")))
    }
}

fn build_result(
    key: FormatKey,
    file_path: PathBuf,
    size_bytes: u64,
    media: ExtractedMedia,
    workspace: TempDir,
) -> DownloadResult {
    let fallback_title = if key.is_audio() { "Audio" } else { "Video" };
    let duration_seconds = media.duration_secs();

    DownloadResult {
        key,
        file_path,
        size_bytes,
        title: media
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_title.to_string()),
        duration_seconds,
        width: media.width,
        height: media.height,
        uploader: media.uploader,
        workspace,
    }
}

/// Locate the produced file inside `workspace`.
///
/// Trusts the reported path when it exists inside the workspace, otherwise
/// picks the largest regular file there.
async fn resolve_output(
    workspace: &Path,
    reported: Option<&Path>,
) -> Result<PathBuf, DownloadError> {
    if let Some(path) = reported {
        if path.starts_with(workspace) && tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(path.to_path_buf());
        }
        debug!(reported = %path.display(), "Reported path unusable, scanning workspace");
    }

    let mut entries = tokio::fs::read_dir(workspace)
        .await
        .map_err(|e| DownloadError::Unexpected(format!("Failed to read workspace: {e}")))?;

    let mut largest: Option<(u64, PathBuf)> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DownloadError::Unexpected(format!("Failed to read workspace: {e}")))?
    {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        if largest.as_ref().is_none_or(|(size, _)| metadata.len() > *size) {
            largest = Some((metadata.len(), entry.path()));
        }
    }

    largest
        .map(|(_, path)| path)
        .ok_or_else(|| DownloadError::Unexpected("Downloaded file not found".to_string()))
}
