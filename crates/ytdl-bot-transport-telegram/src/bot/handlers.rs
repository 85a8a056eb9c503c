use crate::bot::views::{format_keyboard, start_keyboard, DefaultDownloadView, DownloadView};
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};
use tracing::{debug, info};
use ytdl_bot_core::service::DownloadService;

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start the bot and show welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage instructions
    #[command(description = "How to use the bot.")]
    Help,
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!("User {user_id} ({user_name}) initiated /start command.");

    bot.send_message(msg.chat.id, DefaultDownloadView::welcome_message())
        .parse_mode(ParseMode::Html)
        .reply_markup(start_keyboard())
        .await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the instructions cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, DefaultDownloadView::help_message())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle a text message as a candidate link.
///
/// A supported link becomes the chat's pending request and the format menu
/// is shown; anything else gets the invalid-link reply.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, service: Arc<DownloadService>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    match service.submit_link(chat_id.0, text).await {
        Ok(()) => {
            info!(chat_id = chat_id.0, user_id = get_user_id_safe(&msg), "Link accepted");
            bot.send_message(chat_id, DefaultDownloadView::choose_format())
                .reply_markup(format_keyboard())
                .await?;
        }
        Err(e) => {
            debug!(chat_id = chat_id.0, error = %e, "Rejected text message");
            bot.send_message(chat_id, DefaultDownloadView::error_message(&e))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}
