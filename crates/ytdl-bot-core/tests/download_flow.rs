use anyhow::anyhow;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ytdl_bot_core::download::{
    DownloadError, DownloadResult, DownloadWorkflow, ExtractedMedia, ExtractionError,
    ExtractionRequest, MediaDelivery, MediaExtractor,
};
use ytdl_bot_core::formats::{FormatCatalog, FormatKey};
use ytdl_bot_core::pending::PendingRequests;
use ytdl_bot_core::service::DownloadService;

const MB: u64 = 1024 * 1024;
const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Writes a sparse file of a fixed size and remembers what it was asked
struct FakeExtractor {
    size: u64,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl FakeExtractor {
    fn new(size: u64) -> Self {
        Self {
            size,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractedMedia, ExtractionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let path = request.workspace.join("Never_Gonna_Give_You_Up.mp4");
        std::fs::File::create(&path)?.set_len(self.size)?;
        Ok(ExtractedMedia {
            filepath: Some(path),
            title: Some("Never Gonna Give You Up".to_string()),
            duration: Some(212.4),
            width: Some(1280),
            height: Some(720),
            uploader: Some("Rick Astley".to_string()),
            ..ExtractedMedia::default()
        })
    }
}

/// Records delivered files; optionally fails
#[derive(Default)]
struct FakeDelivery {
    fail: bool,
    delivered: Mutex<Vec<(PathBuf, String, Option<u32>)>>,
}

#[async_trait]
impl MediaDelivery for FakeDelivery {
    async fn deliver(&self, media: &DownloadResult) -> anyhow::Result<()> {
        assert!(media.file_path.exists(), "file must exist during delivery");
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((media.file_path.clone(), media.title.clone(), media.height));
        }
        if self.fail {
            return Err(anyhow!("network down"));
        }
        Ok(())
    }
}

fn service_with(extractor: Arc<FakeExtractor>, root: &std::path::Path) -> DownloadService {
    DownloadService::new(
        PendingRequests::new(Duration::from_secs(60), 1_000),
        FormatCatalog::new(true),
        DownloadWorkflow::new(extractor, root),
    )
}

fn entries(root: &std::path::Path) -> usize {
    std::fs::read_dir(root).map_or(0, Iterator::count)
}

#[tokio::test]
async fn link_then_standard_res_delivers_once_and_cleans_up() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let extractor = Arc::new(FakeExtractor::new(10 * MB));
    let service = service_with(extractor.clone(), root.path());
    let delivery = FakeDelivery::default();

    service.submit_link(42, URL).await?;
    let summary = service.select_format(42, "format_720p", &delivery).await?;

    assert_eq!(summary.key, FormatKey::StandardRes);
    assert_eq!(summary.size_bytes, 10 * MB);

    let requests = extractor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, URL);
    assert!(requests[0].format_selector.contains("height<=720"));
    assert_eq!(requests[0].merge_output_format, Some("mp4"));

    let delivered = delivery.delivered.lock().map(|d| d.clone()).unwrap_or_default();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].1, "Never Gonna Give You Up");
    assert_eq!(delivered[0].2, Some(720));
    assert!(!delivered[0].0.exists(), "file must be gone after delivery");
    assert_eq!(entries(root.path()), 0);
    Ok(())
}

#[tokio::test]
async fn plain_text_never_reaches_extractor() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let extractor = Arc::new(FakeExtractor::new(MB));
    let service = service_with(extractor.clone(), root.path());

    let result = service.submit_link(7, "hello").await;
    assert!(matches!(result, Err(DownloadError::InvalidLink)));

    let selection = service
        .select_format(7, "format_1080p", &FakeDelivery::default())
        .await;
    assert!(matches!(selection, Err(DownloadError::NoPendingRequest)));
    assert!(extractor.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_download_is_reported_and_skipped() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let extractor = Arc::new(FakeExtractor::new(51 * MB));
    let service = service_with(extractor, root.path());
    let delivery = FakeDelivery::default();

    service.submit_link(5, URL).await?;
    let result = service.select_format(5, "format_1080p", &delivery).await;

    let Err(err) = result else {
        panic!("expected size rejection");
    };
    assert_eq!(err.to_string(), "File too large: 51.0MB");
    assert!(delivery.delivered.lock().map(|d| d.is_empty()).unwrap_or(false));
    assert_eq!(entries(root.path()), 0);
    Ok(())
}

#[tokio::test]
async fn failed_delivery_still_removes_workspace() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let extractor = Arc::new(FakeExtractor::new(MB));
    let service = service_with(extractor, root.path());
    let delivery = FakeDelivery {
        fail: true,
        ..FakeDelivery::default()
    };

    service.submit_link(8, URL).await?;
    let result = service.select_format(8, "format_audio", &delivery).await;

    assert!(matches!(result, Err(DownloadError::Unexpected(ref m)) if m.contains("network down")));
    assert_eq!(entries(root.path()), 0);
    Ok(())
}

#[tokio::test]
async fn conversations_do_not_share_links() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let extractor = Arc::new(FakeExtractor::new(MB));
    let service = service_with(extractor.clone(), root.path());

    service.submit_link(1, URL).await?;
    service.submit_link(2, "https://youtu.be/9bZkp7q19f0").await?;

    let first = service.take_selection(1, "format_720p").await?;
    let second = service.take_selection(2, "format_720p").await?;
    assert_eq!(first.url, URL);
    assert_eq!(second.url, "https://youtu.be/9bZkp7q19f0");
    Ok(())
}
