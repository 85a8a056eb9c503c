//! Testing helpers and mock utilities.
//!
//! Provides fake downloads and convenient constructors for mocked collaborators.

use crate::download::workflow::MockMediaDelivery;
use crate::download::{ExtractedMedia, ExtractionError, ExtractionRequest};

/// One mebibyte
pub const MB: u64 = 1024 * 1024;

/// Simulate a finished download: create a sparse file of `size` bytes in the
/// request's workspace and report it the way yt-dlp would.
///
/// # Errors
///
/// Returns `ExtractionError::Io` if the file cannot be created.
pub fn fake_download(
    request: &ExtractionRequest,
    size: u64,
    title: &str,
) -> Result<ExtractedMedia, ExtractionError> {
    let path = request.workspace.join(format!("{}.mp4", title.replace(' ', "_")));
    std::fs::File::create(&path)?.set_len(size)?;

    Ok(ExtractedMedia {
        filepath: Some(path),
        filename: None,
        title: Some(title.to_string()),
        duration: Some(212.0),
        width: Some(1280),
        height: Some(720),
        uploader: Some("Rick Astley".to_string()),
    })
}

/// Create a mock delivery that accepts every file.
#[must_use]
pub fn mock_delivery_ok() -> MockMediaDelivery {
    let mut mock = MockMediaDelivery::new();
    mock.expect_deliver().returning(|_| Ok(()));
    mock
}
