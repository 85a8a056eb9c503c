//! Format keys and the extraction policies bound to them.
//!
//! The table is fixed at compile time. The only runtime input is whether a
//! remux tool (ffmpeg) is declared as installed: without it every policy asks
//! for a single pre-muxed stream, so a missing ffmpeg degrades quality instead
//! of failing the download.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Callback data prefix of a format selection
pub const FORMAT_CALLBACK_PREFIX: &str = "format_";

/// User-facing quality/output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKey {
    /// Video up to 1080p
    HighRes,
    /// Video up to 720p
    StandardRes,
    /// Audio track only
    AudioOnly,
}

impl FormatKey {
    /// All keys in menu order
    pub const ALL: [Self; 3] = [Self::HighRes, Self::StandardRes, Self::AudioOnly];

    /// Token used in callback data (`format_<token>`)
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::HighRes => "1080p",
            Self::StandardRes => "720p",
            Self::AudioOnly => "audio",
        }
    }

    /// Button and progress label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighRes => "1080p",
            Self::StandardRes => "720p",
            Self::AudioOnly => "MP3 Audio",
        }
    }

    /// Full callback data for this key
    #[must_use]
    pub fn callback_data(self) -> String {
        format!("{FORMAT_CALLBACK_PREFIX}{}", self.token())
    }

    /// Parse a token (with or without the `format_` prefix).
    ///
    /// Accepts the callback tokens as well as the variant names.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.strip_prefix(FORMAT_CALLBACK_PREFIX).unwrap_or(token);
        match token.to_ascii_lowercase().as_str() {
            "1080p" | "highres" => Some(Self::HighRes),
            "720p" | "standardres" => Some(Self::StandardRes),
            "audio" | "audioonly" => Some(Self::AudioOnly),
            _ => None,
        }
    }

    /// Whether the delivered file is an audio track
    #[must_use]
    pub const fn is_audio(self) -> bool {
        matches!(self, Self::AudioOnly)
    }
}

impl fmt::Display for FormatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the extractor should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTarget {
    /// Video capped at `max_height`, preferring `container`
    Video {
        /// Maximum frame height in pixels
        max_height: u32,
        /// Preferred container extension
        container: &'static str,
    },
    /// Best audio stream, converted to `codec` when post-processing is allowed
    Audio {
        /// Target audio codec
        codec: &'static str,
    },
}

/// Concrete extraction settings for one format key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPolicy {
    /// Key this policy was built for
    pub key: FormatKey,
    /// Requested output
    pub target: MediaTarget,
    /// Whether merging/converting through a remux tool is allowed
    pub allow_postprocess: bool,
}

impl ExtractionPolicy {
    /// yt-dlp format selector for this policy
    #[must_use]
    pub fn format_selector(&self) -> String {
        match (self.target, self.allow_postprocess) {
            (MediaTarget::Video { max_height, container }, true) => format!(
                "bestvideo[height<={max_height}][ext={container}]+bestaudio/best[height<={max_height}][ext={container}]"
            ),
            (MediaTarget::Video { max_height, container }, false) => {
                format!("best[height<={max_height}][ext={container}]/best[height<={max_height}]")
            }
            (MediaTarget::Audio { .. }, _) => "bestaudio/best".to_string(),
        }
    }

    /// Container to merge separate streams into, if any
    #[must_use]
    pub const fn merge_output_format(&self) -> Option<&'static str> {
        match (self.target, self.allow_postprocess) {
            (MediaTarget::Video { container, .. }, true) => Some(container),
            _ => None,
        }
    }

    /// Codec to convert extracted audio into, if any
    #[must_use]
    pub const fn extract_audio_codec(&self) -> Option<&'static str> {
        match (self.target, self.allow_postprocess) {
            (MediaTarget::Audio { codec }, true) => Some(codec),
            _ => None,
        }
    }

    /// Height cap for video policies
    #[must_use]
    pub const fn max_height(&self) -> Option<u32> {
        match self.target {
            MediaTarget::Video { max_height, .. } => Some(max_height),
            MediaTarget::Audio { .. } => None,
        }
    }
}

const TARGETS: [(FormatKey, MediaTarget); 3] = [
    (
        FormatKey::HighRes,
        MediaTarget::Video {
            max_height: 1080,
            container: "mp4",
        },
    ),
    (
        FormatKey::StandardRes,
        MediaTarget::Video {
            max_height: 720,
            container: "mp4",
        },
    ),
    (FormatKey::AudioOnly, MediaTarget::Audio { codec: "mp3" }),
];

/// Maps format keys to extraction policies
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatCatalog {
    remux_available: bool,
}

impl FormatCatalog {
    /// Create a catalog. `remux_available` declares that ffmpeg is installed.
    #[must_use]
    pub const fn new(remux_available: bool) -> Self {
        Self { remux_available }
    }

    /// Policy for a key. Total over all keys.
    #[must_use]
    pub fn policy_for(&self, key: FormatKey) -> ExtractionPolicy {
        let target = TARGETS
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(TARGETS[1].1, |(_, target)| *target);

        ExtractionPolicy {
            key,
            target,
            allow_postprocess: self.remux_available,
        }
    }

    /// Policy for raw callback data; unknown data falls back to `StandardRes`.
    #[must_use]
    pub fn policy_for_callback(&self, data: &str) -> ExtractionPolicy {
        let key = FormatKey::from_token(data).unwrap_or(FormatKey::StandardRes);
        self.policy_for(key)
    }
}
