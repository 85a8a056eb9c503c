//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Wraps sends, edits and deletes in [`retry_transport_operation`] so transient
//! network failures are retried with exponential backoff and jitter.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId, ParseMode};
use tracing::{debug, warn};
use ytdl_bot_core::utils::{retry_transport_operation, truncate_str};

/// Telegram rejects texts above 4096 characters
const MAX_EDIT_CHARS: usize = 4000;

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Message> {
    let text = text.into();
    retry_transport_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(pm) = parse_mode {
            req = req.parse_mode(pm);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message with automatic retry on network failures.
///
/// Returns `Ok(None)` when Telegram reports the text unchanged.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Option<Message>> {
    let text = text.into();
    retry_transport_operation(|| async {
        let mut req = bot.edit_message_text(chat_id, msg_id, text.clone());
        if let Some(pm) = parse_mode {
            req = req.parse_mode(pm);
        }
        match req.await {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => {
                if e.to_string().contains("message is not modified") {
                    return Ok(None);
                }
                Err(anyhow::anyhow!("Telegram edit error: {e}"))
            }
        }
    })
    .await
}

/// Cut already rendered HTML to `max_chars` without leaving a partial
/// entity (`&am`) or tag (`<i`) at the end.
fn truncate_html(text: &str, max_chars: usize) -> String {
    let mut cut = truncate_str(text, max_chars);
    loop {
        let len = cut.len();
        if let Some(pos) = cut.rfind('&') {
            if !cut[pos..].contains(';') {
                cut.truncate(pos);
            }
        }
        if let Some(pos) = cut.rfind('<') {
            if !cut[pos..].contains('>') {
                cut.truncate(pos);
            }
        }
        if cut.len() == len {
            return cut;
        }
    }
}

/// Edit an HTML message, degrading gracefully.
///
/// Truncates overlong text, retries transient errors and swallows the
/// expected "not modified" / "not found" cases.
///
/// Returns `true` if the message now shows `text`.
pub async fn edit_message_safe_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> bool {
    const ERROR_NOT_FOUND: &str = "message to edit not found";

    let truncated = if text.chars().count() > MAX_EDIT_CHARS {
        format!(
            "{}...\n\n<i>(message truncated)</i>",
            truncate_html(text, MAX_EDIT_CHARS)
        )
    } else {
        text.to_string()
    };

    match edit_message_resilient(bot, chat_id, msg_id, truncated, Some(ParseMode::Html)).await {
        Ok(Some(_)) => true,
        Ok(None) => {
            debug!("Message update skipped: message is not modified");
            true
        }
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains(ERROR_NOT_FOUND) {
                debug!("Message update skipped: {err_msg}");
            } else {
                warn!("Failed to edit message after retries: {e}");
            }
            false
        }
    }
}

/// Delete a message with retry; a message that is already gone counts as deleted.
pub async fn delete_message_resilient(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> bool {
    let result = retry_transport_operation(|| async {
        match bot.delete_message(chat_id, msg_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message to delete not found") => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Telegram delete error: {e}")),
        }
    })
    .await;

    if let Err(e) = result {
        warn!("Failed to delete message after retries: {e}");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::truncate_html;

    #[test]
    fn test_truncation_never_splits_an_entity() {
        let text = format!("❌ Download error: {}", "a &amp; b ".repeat(500));
        for max in [19, 21, 22, 23, 24, 25, 4000] {
            let cut = truncate_html(&text, max);
            assert!(cut.chars().count() <= max);
            let tail = cut.rfind('&').map_or("", |pos| &cut[pos..]);
            assert!(tail.is_empty() || tail.contains(';'), "{max}: {cut}");
        }
        assert_eq!(truncate_html("x &amp; y", 4), "x ");
        assert_eq!(truncate_html("x &amp; y", 7), "x &amp;");
    }

    #[test]
    fn test_truncation_never_splits_a_tag() {
        assert_eq!(truncate_html("ok <b>bold</b>", 5), "ok ");
        assert_eq!(truncate_html("ok <b>bold</b>", 8), "ok <b>bo");
        assert_eq!(truncate_html("short", 4000), "short");
    }
}
