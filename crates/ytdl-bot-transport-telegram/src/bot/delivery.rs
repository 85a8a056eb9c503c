//! Uploads finished downloads to a Telegram chat.

use crate::bot::views::{audio_performer, video_caption};
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::info;
use ytdl_bot_core::download::{DownloadResult, MediaDelivery};
use ytdl_bot_core::utils::retry_transport_operation;

/// Sends the file as a video or audio message to one chat
pub struct TelegramDelivery {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramDelivery {
    /// Deliver into `chat_id` using `bot`
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    async fn send_video(&self, media: &DownloadResult) -> Result<()> {
        let caption = video_caption(&media.title, media.height);
        retry_transport_operation(|| async {
            let mut req = self
                .bot
                .send_video(self.chat_id, InputFile::file(media.file_path.clone()))
                .caption(caption.clone())
                .supports_streaming(true);
            if media.duration_seconds > 0 {
                req = req.duration(media.duration_seconds);
            }
            if let Some(width) = media.width {
                req = req.width(width);
            }
            if let Some(height) = media.height {
                req = req.height(height);
            }
            req.await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram send video error: {e}"))
        })
        .await
    }

    async fn send_audio(&self, media: &DownloadResult) -> Result<()> {
        let performer = audio_performer(media.uploader.as_deref());
        retry_transport_operation(|| async {
            let mut req = self
                .bot
                .send_audio(self.chat_id, InputFile::file(media.file_path.clone()))
                .caption(media.title.clone())
                .title(media.title.clone())
                .performer(performer.clone());
            if media.duration_seconds > 0 {
                req = req.duration(media.duration_seconds);
            }
            req.await
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram send audio error: {e}"))
        })
        .await
    }
}

#[async_trait]
impl MediaDelivery for TelegramDelivery {
    async fn deliver(&self, media: &DownloadResult) -> Result<()> {
        info!(
            chat_id = self.chat_id.0,
            format = %media.key,
            size_mb = media.size_mb(),
            "Uploading media"
        );
        if media.key.is_audio() {
            self.send_audio(media).await
        } else {
            self.send_video(media).await
        }
    }
}
