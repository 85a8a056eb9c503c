//! Download UI components
//!
//! Texts, captions and inline keyboards for the link → format → file flow.
//! Messages that go through HTML parse mode escape every dynamic fragment.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use ytdl_bot_core::download::DownloadError;
use ytdl_bot_core::formats::FormatKey;
use ytdl_bot_core::utils::truncate_str;

// ─────────────────────────────────────────────────────────────────────────────
// Callback constants
// ─────────────────────────────────────────────────────────────────────────────

/// Callback data for the "How to use" button
pub const HELP_CALLBACK: &str = "help";

/// Where to get the remux tool
pub const FFMPEG_DOWNLOAD_URL: &str = "https://ffmpeg.org/download.html";

/// Telegram limit for callback answer texts
const CALLBACK_ALERT_MAX_CHARS: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for download UI view rendering
pub trait DownloadView {
    /// Reply to `/start`
    fn welcome_message() -> &'static str;

    /// Usage instructions
    fn help_message() -> &'static str;

    /// Submitted text is not a supported link
    fn invalid_link() -> &'static str;

    /// Prompt shown above the format keyboard
    fn choose_format() -> &'static str;

    /// Format chosen but no link is pending
    fn link_not_found() -> &'static str;

    /// Progress message after a format was chosen
    fn download_started(key: FormatKey) -> String;

    /// Sent after the file was delivered
    fn download_complete() -> &'static str;

    /// Reply to users outside the allowlist
    fn access_denied() -> &'static str;

    /// Render a failed request
    fn error_message(error: &DownloadError) -> String;

    /// Plain-text popup for a button press that cannot be served
    fn callback_alert(error: &DownloadError) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English-language implementation of `DownloadView`
pub struct DefaultDownloadView;

impl DownloadView for DefaultDownloadView {
    fn welcome_message() -> &'static str {
        "🎬 <b>YouTube Downloader Bot</b>\n\n\
Send me a YouTube link and I will download it for you.\n\
After sending the link you can choose the format."
    }

    fn help_message() -> &'static str {
        "📚 <b>How to use:</b>\n\n\
1. Send the bot a YouTube link\n\
2. Choose the format (1080p, 720p or audio)\n\
3. Wait for the download to finish\n\n\
⚠️ <b>Requirements:</b>\n\
- Install FFmpeg for full functionality\n\
(download: https://ffmpeg.org/download.html)"
    }

    fn invalid_link() -> &'static str {
        "⚠️ Please send a valid YouTube link"
    }

    fn choose_format() -> &'static str {
        "🛠 Choose a download format:"
    }

    fn link_not_found() -> &'static str {
        "❌ Error: link not found. Send the link again."
    }

    fn download_started(key: FormatKey) -> String {
        format!("⏳ Starting download in {}...", key.label())
    }

    fn download_complete() -> &'static str {
        "✅ Download completed successfully!"
    }

    fn access_denied() -> &'static str {
        "⛔️ Access denied"
    }

    fn error_message(error: &DownloadError) -> String {
        match error {
            DownloadError::InvalidLink => Self::invalid_link().to_string(),
            DownloadError::NoPendingRequest => Self::link_not_found().to_string(),
            DownloadError::ExtractionFailed(message) => {
                let mut text = format!(
                    "❌ Download error: {}",
                    html_escape::encode_text(message)
                );
                if error.needs_remux_tool() {
                    text.push_str(&format!(
                        "\n\nInstall FFmpeg for full functionality:\n{FFMPEG_DOWNLOAD_URL}"
                    ));
                }
                text
            }
            DownloadError::TooLarge(size_mb) => format!(
                "❌ File too large ({size_mb:.1}MB &gt; 50MB)\nTry choosing a lower quality."
            ),
            DownloadError::Unexpected(message) => {
                format!("❌ Unexpected error: {}", html_escape::encode_text(message))
            }
        }
    }

    fn callback_alert(error: &DownloadError) -> String {
        match error {
            DownloadError::NoPendingRequest => Self::link_not_found().to_string(),
            other => truncate_str(format!("❌ {other}"), CALLBACK_ALERT_MAX_CHARS),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Captions
// ─────────────────────────────────────────────────────────────────────────────

/// Caption of a delivered video: `<title> | <height>p`
#[must_use]
pub fn video_caption(title: &str, height: Option<u32>) -> String {
    height.map_or_else(
        || format!("{title} | ?p"),
        |height| format!("{title} | {height}p"),
    )
}

/// Performer shown on a delivered audio track
#[must_use]
pub fn audio_performer(uploader: Option<&str>) -> String {
    uploader
        .filter(|u| !u.trim().is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Inline keyboard attached to the welcome message
///
/// # Examples
///
/// ```
/// use ytdl_bot_transport_telegram::bot::views::start_keyboard;
/// let keyboard = start_keyboard();
/// assert_eq!(keyboard.inline_keyboard.len(), 1);
/// ```
#[must_use]
pub fn start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "How to use",
        HELP_CALLBACK,
    )]])
}

/// Format selection keyboard: both video qualities on one row, audio below
#[must_use]
pub fn format_keyboard() -> InlineKeyboardMarkup {
    let button = |key: FormatKey| InlineKeyboardButton::callback(key.label(), key.callback_data());
    InlineKeyboardMarkup::new(vec![
        vec![button(FormatKey::HighRes), button(FormatKey::StandardRes)],
        vec![button(FormatKey::AudioOnly)],
    ])
}
