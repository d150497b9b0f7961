mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{TestServer, client, media_bytes, segment_body};
use reel_engine::classify::DEFAULT_CONTENT_TYPE;
use reel_engine::{
    ArtifactUploader, ContentClassifier, Destination, DownloadOrchestrator, DownloadOutcome,
    DownloadRequest, LocalDirUploader, MediaKind, OnProgress, OrchestratorConfig, PipelineState,
    ProgressEvent, UploadError,
};
use reqwest::header::HeaderMap;
use tempfile::TempDir;

struct Harness {
    server: TestServer,
    downloads: TempDir,
    store: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: TestServer::start().await,
            downloads: tempfile::tempdir().unwrap(),
            store: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            downloads_dir: self.downloads.path().to_path_buf(),
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator(&self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(client(), Arc::new(LocalDirUploader::new(self.store.path())))
            .with_config(self.config())
    }

    fn stored(&self, bucket: &str, key: &str) -> Vec<u8> {
        std::fs::read(self.store.path().join(bucket).join(key)).unwrap()
    }

    fn downloads_left(&self) -> usize {
        std::fs::read_dir(self.downloads.path()).unwrap().count()
    }
}

struct FailingUploader;

#[async_trait]
impl ArtifactUploader for FailingUploader {
    async fn upload(&self, _artifact: &Path, _destination: &Destination) -> Result<(), UploadError> {
        Err(UploadError::Storage("bucket is read-only".to_string()))
    }
}

#[tokio::test]
async fn test_playlist_window_is_uploaded() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/hls/index.m3u8"), "media")
        .with_time_range(Some(15.0), Some(25.0));

    let outcome = harness.orchestrator().run(request).await;

    let DownloadOutcome::Success(completed) = outcome else {
        panic!("unexpected outcome: {outcome}");
    };
    let expected = [segment_body(1), segment_body(2)].concat();
    assert_eq!(completed.kind, MediaKind::Playlist);
    assert_eq!(completed.key, "reel/index(15,25).ts");
    assert_eq!(completed.bytes, expected.len() as u64);
    assert_eq!(
        completed.artifact,
        harness.downloads.path().join("index(15,25).ts")
    );
    assert_eq!(std::fs::read(&completed.artifact).unwrap(), expected);
    assert_eq!(harness.stored("media", "reel/index(15,25).ts"), expected);
}

#[tokio::test]
async fn test_empty_playlist_fails() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/hls/empty.m3u8"), "media");

    let outcome = harness.orchestrator().run(request).await;

    assert_eq!(outcome, DownloadOutcome::Failed("Segment URLs not found".to_string()));
    assert_eq!(harness.downloads_left(), 0);
}

#[tokio::test]
async fn test_unreachable_playlist_leaves_existing_artifact() {
    let harness = Harness::new().await;
    let previous = harness.downloads.path().join("offline.ts");
    std::fs::write(&previous, b"earlier run").unwrap();
    let request = DownloadRequest::new(harness.server.url("/hls/offline.m3u8"), "media");

    let outcome = harness.orchestrator().run(request).await;

    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert_eq!(std::fs::read(&previous).unwrap(), b"earlier run");
}

#[tokio::test]
async fn test_byte_range_download() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/media/clip.mp4"), "media")
        .with_time_range(Some(1.0), Some(2.0))
        .with_byte_range(100_000);

    let outcome = harness.orchestrator().run(request).await;

    let DownloadOutcome::Success(completed) = outcome else {
        panic!("unexpected outcome: {outcome}");
    };
    assert_eq!(completed.kind, MediaKind::General);
    assert_eq!(completed.content_type, "video/mp4");
    assert_eq!(completed.key, "reel/clip(ByteRange:100000).mp4");
    assert_eq!(completed.bytes, 100_000);
    assert_eq!(
        harness.stored("media", "reel/clip(ByteRange:100000).mp4"),
        media_bytes()[..100_000]
    );

    let ranges: Vec<_> = harness
        .server
        .log
        .gets("/media/clip.mp4")
        .into_iter()
        .map(|r| r.range)
        .collect();
    assert!(ranges.contains(&Some("bytes=0-99999".to_string())));
}

#[tokio::test]
async fn test_head_fallback_uses_ranged_get() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/media/nohead.pdf"), "docs")
        .with_filename("report");

    let outcome = harness.orchestrator().run(request).await;

    let DownloadOutcome::Success(completed) = outcome else {
        panic!("unexpected outcome: {outcome}");
    };
    assert_eq!(completed.key, "reel/report.pdf");
    assert_eq!(harness.stored("docs", "reel/report.pdf"), b"%PDF-1.7");
    let probe = &harness.server.log.gets("/media/nohead.pdf")[0];
    assert_eq!(probe.range.as_deref(), Some("bytes=0-0"));
}

#[tokio::test]
async fn test_probe_overrides_caller_range() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/media/nohead.pdf"), "docs")
        .with_header("Range", "bytes=5-");

    let outcome = harness.orchestrator().run(request).await;

    assert!(outcome.is_success(), "unexpected outcome: {outcome}");
    let probe = &harness.server.log.gets("/media/nohead.pdf")[0];
    assert_eq!(probe.range_values, vec!["bytes=0-0"]);
}

#[tokio::test]
async fn test_probe_failure_falls_back_to_binary() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/media/probe-hostile"), "media");

    let outcome = harness.orchestrator().run(request).await;

    let DownloadOutcome::Success(completed) = outcome else {
        panic!("unexpected outcome: {outcome}");
    };
    assert_eq!(completed.kind, MediaKind::General);
    assert_eq!(completed.content_type, DEFAULT_CONTENT_TYPE);
    assert_eq!(completed.key, "reel/probe-hostile.bin");
    assert_eq!(completed.bytes, media_bytes().len() as u64);
}

#[tokio::test]
async fn test_failed_segment_removes_partial_artifact() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new(harness.server.url("/hls/broken.m3u8"), "media");

    let outcome = harness.orchestrator().run(request).await;

    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert_eq!(harness.downloads_left(), 0);
    assert!(!harness.store.path().join("media").exists());
}

#[tokio::test]
async fn test_failed_segment_can_keep_partial_artifact() {
    let harness = Harness::new().await;
    let orchestrator = harness.orchestrator().with_config(OrchestratorConfig {
        keep_failed_artifacts: true,
        ..harness.config()
    });
    let request = DownloadRequest::new(harness.server.url("/hls/broken.m3u8"), "media");

    let outcome = orchestrator.run(request).await;

    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert_eq!(harness.downloads_left(), 1);
}

#[tokio::test]
async fn test_upload_failure_keeps_artifact() {
    let harness = Harness::new().await;
    let orchestrator =
        DownloadOrchestrator::new(client(), Arc::new(FailingUploader)).with_config(harness.config());
    let request = DownloadRequest::new(harness.server.url("/media/clip.mp4"), "media")
        .with_byte_range(10);

    let outcome = orchestrator.run(request).await;

    let DownloadOutcome::Failed(reason) = outcome else {
        panic!("unexpected outcome: {outcome}");
    };
    assert!(reason.contains("bucket is read-only"), "{reason}");
    let artifact = harness.downloads.path().join("clip(ByteRange:10).mp4");
    assert_eq!(std::fs::read(artifact).unwrap(), media_bytes()[..10]);
}

#[tokio::test]
async fn test_remove_after_upload() {
    let harness = Harness::new().await;
    let orchestrator = harness.orchestrator().with_config(OrchestratorConfig {
        remove_after_upload: true,
        ..harness.config()
    });
    let request = DownloadRequest::new(harness.server.url("/media/clip.mp4"), "media")
        .with_byte_range(10);

    let outcome = orchestrator.run(request).await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(harness.downloads_left(), 0);
    assert_eq!(harness.stored("media", "reel/clip(ByteRange:10).mp4"), media_bytes()[..10]);
}

#[tokio::test]
async fn test_invalid_request_fails_without_network() {
    let harness = Harness::new().await;
    let request = DownloadRequest::new("ftp://example.com/file.bin", "media");

    let outcome = harness.orchestrator().run(request).await;

    assert!(matches!(outcome, DownloadOutcome::Failed(_)));
    assert!(harness.server.log.all().is_empty());
}

#[tokio::test]
async fn test_state_transitions() {
    let harness = Harness::new().await;
    let states = Arc::new(Mutex::new(Vec::new()));
    let observer = states.clone();
    let on_progress: OnProgress = Arc::new(move |event: ProgressEvent| {
        if let ProgressEvent::StateChanged { state } = event {
            observer.lock().unwrap().push(state);
        }
    });
    let orchestrator = harness.orchestrator().with_progress(on_progress);

    let ok = orchestrator
        .run(DownloadRequest::new(harness.server.url("/hls/index.m3u8"), "media"))
        .await;
    assert!(ok.is_success(), "{ok}");
    assert_eq!(
        std::mem::take(&mut *states.lock().unwrap()),
        vec![
            PipelineState::Start,
            PipelineState::Classifying,
            PipelineState::PlaylistPath,
            PipelineState::Uploading,
            PipelineState::Succeeded,
        ]
    );

    let failed = orchestrator
        .run(DownloadRequest::new(harness.server.url("/media/gone.mp4"), "media"))
        .await;
    assert!(!failed.is_success());
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            PipelineState::Start,
            PipelineState::Classifying,
            PipelineState::GeneralPath,
            PipelineState::Failed,
        ]
    );
}

#[tokio::test]
async fn test_classification_is_stable() {
    let server = TestServer::start().await;
    let classifier = ContentClassifier::new(client());

    for path in ["/hls/index.m3u8", "/media/clip.mp4", "/media/untyped"] {
        let first = classifier.classify(&server.url(path), &HeaderMap::new()).await.unwrap();
        let second = classifier.classify(&server.url(path), &HeaderMap::new()).await.unwrap();
        assert_eq!(first, second, "{path}");
    }

    let untyped = classifier
        .classify(&server.url("/media/untyped"), &HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(untyped.content_type, DEFAULT_CONTENT_TYPE);
    assert_eq!(untyped.extension, ".bin");
}
