#![deny(missing_docs)]
//! YTDL Bot core library.
//!
//! Transport-agnostic download logic: link recognition, format policies,
//! pending request state and the download-and-deliver workflow.

/// Configuration management.
pub mod config;
/// Download workflow, extraction seam and yt-dlp adapter.
pub mod download;
/// Format keys and extraction policies.
pub mod formats;
/// Supported link recognition.
pub mod link;
/// Per-conversation pending requests.
pub mod pending;
/// Conversation-level download service.
pub mod service;
/// Utility functions.
pub mod utils;

/// Test fixtures.
#[cfg(test)]
pub mod testing;
