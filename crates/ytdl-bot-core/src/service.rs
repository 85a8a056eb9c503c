//! Conversation-level entry points.
//!
//! Ties link recognition, pending requests, the format catalog and the
//! workflow together so transports only deal with chat plumbing.

use crate::config::{DownloaderSettings, PENDING_REQUEST_MAX_CAPACITY};
use crate::download::{DownloadError, DownloadSummary, DownloadWorkflow, MediaDelivery};
use crate::formats::{ExtractionPolicy, FormatCatalog};
use crate::link::is_supported_link;
use crate::pending::PendingRequests;
use tracing::{info, warn};

/// A format selection resolved against a pending link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Link to download
    pub url: String,
    /// Policy chosen by the user
    pub policy: ExtractionPolicy,
}

/// Download front door shared by all conversations
pub struct DownloadService {
    pending: PendingRequests,
    catalog: FormatCatalog,
    workflow: DownloadWorkflow,
}

impl DownloadService {
    /// Assemble a service from its parts
    #[must_use]
    pub const fn new(
        pending: PendingRequests,
        catalog: FormatCatalog,
        workflow: DownloadWorkflow,
    ) -> Self {
        Self {
            pending,
            catalog,
            workflow,
        }
    }

    /// Build the yt-dlp backed service described by `settings`
    #[must_use]
    pub fn from_settings(settings: &DownloaderSettings) -> Self {
        Self::new(
            PendingRequests::new(settings.pending_request_ttl(), PENDING_REQUEST_MAX_CAPACITY),
            FormatCatalog::new(settings.ffmpeg_available),
            DownloadWorkflow::from_settings(settings),
        )
    }

    /// Pending request store
    #[must_use]
    pub const fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Validate `text` and remember it as the conversation's pending link.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidLink`] if `text` is not a supported
    /// link; nothing is stored in that case.
    pub async fn submit_link(&self, conversation_id: i64, text: &str) -> Result<(), DownloadError> {
        let url = text.trim();
        if !is_supported_link(url) {
            return Err(DownloadError::InvalidLink);
        }
        self.pending.put(conversation_id, url).await;
        Ok(())
    }

    /// Consume the pending link for a format selection event.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NoPendingRequest`] if no link is pending
    /// (never submitted, expired or already consumed).
    pub async fn take_selection(
        &self,
        conversation_id: i64,
        callback_data: &str,
    ) -> Result<Selection, DownloadError> {
        let url = self
            .pending
            .take_url(conversation_id)
            .await
            .ok_or(DownloadError::NoPendingRequest)?;
        let policy = self.catalog.policy_for_callback(callback_data);
        info!(conversation_id, format = %policy.key, "Format selected");
        Ok(Selection { url, policy })
    }

    /// Run the workflow for a resolved selection and hand the file to `delivery`.
    ///
    /// # Errors
    ///
    /// See [`DownloadWorkflow::run_and_deliver`].
    pub async fn download(
        &self,
        selection: &Selection,
        delivery: &dyn MediaDelivery,
    ) -> Result<DownloadSummary, DownloadError> {
        let result = self
            .workflow
            .run_and_deliver(&selection.url, &selection.policy, delivery)
            .await;
        if let Err(ref e) = result {
            warn!(url = %selection.url, error = %e, "Download request failed");
        }
        result
    }

    /// Take the pending link and download it in one step.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::take_selection`] or [`Self::download`].
    pub async fn select_format(
        &self,
        conversation_id: i64,
        callback_data: &str,
        delivery: &dyn MediaDelivery,
    ) -> Result<DownloadSummary, DownloadError> {
        let selection = self.take_selection(conversation_id, callback_data).await?;
        self.download(&selection, delivery).await
    }
}
