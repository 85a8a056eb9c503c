use crate::bot::delivery::TelegramDelivery;
use crate::bot::resilient::{
    delete_message_resilient, edit_message_safe_resilient, send_message_resilient,
};
use crate::bot::views::{DefaultDownloadView, DownloadView};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MessageId, ParseMode};
use tracing::{error, info, warn};
use ytdl_bot_core::download::DownloadError;
use ytdl_bot_core::service::{DownloadService, Selection};

fn callback_target(q: &CallbackQuery) -> Option<(ChatId, MessageId)> {
    q.message.as_ref().map(|m| (m.chat().id, m.id()))
}

/// "How to use" button: replace the message with the instructions.
///
/// # Errors
///
/// Returns an error if the instructions cannot be sent.
pub async fn handle_help_callback(bot: Bot, q: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    if let Some((chat_id, msg_id)) = callback_target(&q) {
        if edit_message_safe_resilient(&bot, chat_id, msg_id, DefaultDownloadView::help_message())
            .await
        {
            return Ok(());
        }
    }

    send_message_resilient(
        &bot,
        ChatId::from(q.from.id),
        DefaultDownloadView::help_message(),
        Some(ParseMode::Html),
    )
    .await?;
    Ok(())
}

/// Format button: consume the pending link and start the download.
///
/// The download runs in a spawned task; the progress message is deleted on
/// success or replaced by the error text on failure.
///
/// # Errors
///
/// Returns an error if the callback has no message to report progress in.
pub async fn handle_format_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<DownloadService>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let Some((chat_id, msg_id)) = callback_target(&q) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Err(anyhow::anyhow!("Callback message missing chat id"));
    };

    // A stale press answers in a popup; the message may already show a running download
    let selection = match service.take_selection(chat_id.0, data).await {
        Ok(selection) => selection,
        Err(e) => {
            info!(chat_id = chat_id.0, error = %e, "Format chosen without a pending link");
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text(DefaultDownloadView::callback_alert(&e))
                .show_alert(true)
                .await;
            return Ok(());
        }
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;

    edit_message_safe_resilient(
        &bot,
        chat_id,
        msg_id,
        &DefaultDownloadView::download_started(selection.policy.key),
    )
    .await;

    tokio::spawn(run_download(bot, service, selection, chat_id, msg_id));
    Ok(())
}

async fn run_download(
    bot: Bot,
    service: Arc<DownloadService>,
    selection: Selection,
    chat_id: ChatId,
    progress_id: MessageId,
) {
    let delivery = TelegramDelivery::new(bot.clone(), chat_id);

    match service.download(&selection, &delivery).await {
        Ok(summary) => {
            info!(
                chat_id = chat_id.0,
                format = %summary.key,
                title = %summary.title,
                size_bytes = summary.size_bytes,
                "Download delivered"
            );
            delete_message_resilient(&bot, chat_id, progress_id).await;
            if let Err(e) = send_message_resilient(
                &bot,
                chat_id,
                DefaultDownloadView::download_complete(),
                None,
            )
            .await
            {
                warn!("Failed to send completion message: {e}");
            }
        }
        Err(e) => {
            if matches!(e, DownloadError::Unexpected(_)) {
                error!(chat_id = chat_id.0, error = %e, "Unexpected download failure");
            }
            let text = DefaultDownloadView::error_message(&e);
            if !edit_message_safe_resilient(&bot, chat_id, progress_id, &text).await {
                let _ = send_message_resilient(&bot, chat_id, text, Some(ParseMode::Html)).await;
            }
        }
    }
}
