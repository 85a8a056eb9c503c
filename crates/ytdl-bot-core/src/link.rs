//! Recognition of supported video links.
//!
//! Accepts the usual YouTube URL shapes: optional scheme, optional `www.`,
//! the `youtube` / `youtu` / `youtube-nocookie` hosts on `.com` or `.be`, and
//! a `watch?v=`, `embed/`, `v/` or `...?v=` path ending in an 11 character
//! video id. The pattern is anchored at the start of the trimmed text only.

// lazy_regex! validates the pattern at compile time
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// Match a supported video URL prefix
static RE_VIDEO_LINK: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+\?v=)?([^&=%\?]{11})"
);

/// Returns `true` if `text` looks like a link the extractor can handle.
///
/// Never fails: malformed input is simply not a match.
///
/// # Examples
///
/// ```
/// use ytdl_bot_core::link::is_supported_link;
///
/// assert!(is_supported_link("https://youtu.be/dQw4w9WgXcQ"));
/// assert!(!is_supported_link("hello"));
/// ```
#[must_use]
pub fn is_supported_link(text: &str) -> bool {
    RE_VIDEO_LINK.is_match(text.trim())
}
