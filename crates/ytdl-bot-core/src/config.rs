//! Configuration and settings management
//!
//! Loads downloader settings from config files and environment variables
//! and defines the fixed extraction constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Build the layered configuration used by every crate in the workspace.
///
/// Sources, later ones overriding earlier ones:
/// `config/default`, `config/{RUN_MODE}`, `config/local`,
/// `APP__*` environment variables, then plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE env vars map to snake_case keys; empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Settings of the download workflow and the yt-dlp collaborator
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DownloaderSettings {
    /// Path or name of the yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    /// Directory under which per-request workspaces are created.
    /// Falls back to the OS temp dir.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Whether ffmpeg is installed next to yt-dlp.
    /// Enables stream merging and audio conversion.
    #[serde(default)]
    pub ffmpeg_available: bool,

    /// Hard deadline for a single yt-dlp run
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// How long a submitted link waits for a format choice
    #[serde(default = "default_pending_request_ttl_secs")]
    pub pending_request_ttl_secs: u64,
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

const fn default_download_timeout_secs() -> u64 {
    DOWNLOAD_TIMEOUT_SECS
}

const fn default_pending_request_ttl_secs() -> u64 {
    PENDING_REQUEST_TTL_SECS
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            download_dir: None,
            ffmpeg_available: false,
            download_timeout_secs: DOWNLOAD_TIMEOUT_SECS,
            pending_request_ttl_secs: PENDING_REQUEST_TTL_SECS,
        }
    }
}

impl DownloaderSettings {
    /// Load downloader settings from config files and environment.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ytdl_bot_core::config::DownloaderSettings;
    ///
    /// let settings = DownloaderSettings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Deadline for one extraction run
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Idle lifetime of a pending request
    #[must_use]
    pub const fn pending_request_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_request_ttl_secs)
    }

    /// Directory where workspaces are created
    #[must_use]
    pub fn workspace_root(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

// Extraction constants
/// Largest file Telegram bots may upload (50 MiB)
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;
/// Attempts yt-dlp makes on transient network failures
pub const EXTRACTION_RETRIES: u32 = 3;
/// Socket-level timeout passed to yt-dlp
pub const EXTRACTION_SOCKET_TIMEOUT_SECS: u64 = 30;
/// HTTP chunk size passed to yt-dlp (10 MiB)
pub const EXTRACTION_CHUNK_SIZE_BYTES: u64 = 10 * 1024 * 1024;
/// Output file name template inside a workspace
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
/// Prefix of workspace directory names
pub const WORKSPACE_PREFIX: &str = "ytdl-";
/// Default deadline for a whole yt-dlp run
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 600; // 10 minutes
/// Default lifetime of a pending link
pub const PENDING_REQUEST_TTL_SECS: u64 = 3600;
/// Upper bound of simultaneously pending conversations
pub const PENDING_REQUEST_MAX_CAPACITY: u64 = 100_000;

// Telegram API retry configuration
/// Initial retry delay for Telegram API operations
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum retry delay for Telegram API operations
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum attempts for Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
