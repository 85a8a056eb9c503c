//! yt-dlp extractor - runs the yt-dlp binary as a child process
//!
//! The info dict printed after the file reaches its final location
//! (`--print after_move:%()j`) is parsed into [`ExtractedMedia`].

use super::extractor::{ExtractedMedia, ExtractionError, ExtractionRequest, MediaExtractor};
use crate::config::DownloaderSettings;
use crate::utils::truncate_str;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Patterns indicating transient errors that yt-dlp gave up retrying
const RETRYABLE_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "network is unreachable",
    "Temporary failure in name resolution",
];

/// Maximum characters of diagnostic output kept in an error
const MAX_ERROR_LENGTH: usize = 1500;

/// Check if error message indicates a transient network failure
fn is_retryable_ytdlp_error(error_msg: &str) -> bool {
    RETRYABLE_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

/// Pull the diagnostic out of yt-dlp output.
///
/// Prefers `ERROR:` lines; falls back to the whole stream.
fn extract_error_message(stderr: &str, stdout: &str) -> Option<String> {
    let error_lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    let message = if error_lines.is_empty() {
        if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        }
    } else {
        error_lines.join("\n")
    };

    if message.is_empty() {
        None
    } else {
        Some(truncate_str(message, MAX_ERROR_LENGTH))
    }
}

/// Extractor backed by the yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: String,
    timeout: Duration,
}

impl YtDlpExtractor {
    /// Create an extractor running `binary` with a hard `timeout` per run
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Create an extractor from downloader settings
    #[must_use]
    pub fn from_settings(settings: &DownloaderSettings) -> Self {
        Self::new(settings.ytdlp_path.clone(), settings.download_timeout())
    }

    /// Command line arguments for `request`
    #[must_use]
    pub fn build_args(request: &ExtractionRequest) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            request.format_selector.clone(),
            "--output".to_string(),
            request.output_template.to_string_lossy().into_owned(),
            "--retries".to_string(),
            request.retries.to_string(),
            "--socket-timeout".to_string(),
            request.socket_timeout.as_secs().to_string(),
            "--http-chunk-size".to_string(),
            request.chunk_size.to_string(),
        ];

        if request.restrict_filenames {
            args.push("--restrict-filenames".to_string());
        }
        if request.no_playlist {
            args.push("--no-playlist".to_string());
        }
        if let Some(container) = request.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        if let Some(codec) = request.extract_audio_codec {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(codec.to_string());
        }

        args.extend(
            [
                "--no-warnings",
                "--no-progress",
                "--no-simulate",
                "--print",
                "after_move:%()j",
                "--",
            ]
            .map(String::from),
        );
        args.push(request.url.clone());
        args
    }

    fn parse_output(stdout: &str) -> Result<ExtractedMedia, ExtractionError> {
        let line = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
            .ok_or_else(|| {
                ExtractionError::Failed("yt-dlp finished without reporting the downloaded file".into())
            })?;
        Ok(serde_json::from_str(line)?)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractedMedia, ExtractionError> {
        let args = Self::build_args(request);
        debug!(binary = %self.binary, ?args, "Executing yt-dlp command");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExtractionError::Spawn)?;

        // Dropping the future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(url = %request.url, timeout_secs = self.timeout.as_secs(), "yt-dlp timed out");
                return Err(ExtractionError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let message = extract_error_message(&stderr, &stdout)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));

            if is_retryable_ytdlp_error(&message) {
                warn!(error = %message, "yt-dlp failed on a transient network error");
            } else {
                warn!(error = %message, "yt-dlp reported a download error");
            }
            return Err(ExtractionError::Failed(message));
        }

        let media = Self::parse_output(&stdout)?;
        info!(
            url = %request.url,
            title = media.title.as_deref().unwrap_or("?"),
            "yt-dlp download finished"
        );
        Ok(media)
    }
}
