//! # Download orchestrator
//!
//! Drives one [`DownloadRequest`] from probe to upload:
//!
//! ```text
//! Start -> Classifying -> PlaylistPath | GeneralPath -> Uploading -> Succeeded
//!                                  \__________________________\____> Failed
//! ```
//!
//! Every failure is folded into [`DownloadOutcome::Failed`]; `run` never
//! returns an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::DownloadError;
use crate::classify::{Classification, ContentClassifier, DEFAULT_CONTENT_TYPE, MediaKind};
use crate::hls::{
    HlsConfig, HlsDownloaderError, PlaylistLoader, PlaylistSegment, SegmentFetcher,
    parse_segments, select_range,
};
use crate::naming;
use crate::progress::{OnProgress, ProgressEvent, emit};
use crate::range_download::RangeDownloader;
use crate::request::DownloadRequest;
use crate::upload::{ArtifactUploader, Destination};

const TRANSPORT_STREAM_CONTENT_TYPE: &str = "video/mp2t";

/// What gets written into the artifact.
enum Source {
    Segments {
        playlist_url: Url,
        segments: Vec<PlaylistSegment>,
    },
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Classifying,
    PlaylistPath,
    GeneralPath,
    Uploading,
    Succeeded,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::Classifying => "classifying",
            PipelineState::PlaylistPath => "playlist-path",
            PipelineState::GeneralPath => "general-path",
            PipelineState::Uploading => "uploading",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory receiving local artifacts; created on demand.
    pub downloads_dir: PathBuf,
    /// Prefix of every object key. Empty stores objects under their bare
    /// file name.
    pub key_prefix: String,
    /// Keep partially written artifacts when the download step fails.
    pub keep_failed_artifacts: bool,
    /// Delete the local artifact once it was uploaded.
    pub remove_after_upload: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            key_prefix: "reel".to_string(),
            keep_failed_artifacts: false,
            remove_after_upload: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedDownload {
    pub artifact: PathBuf,
    pub bytes: u64,
    pub kind: MediaKind,
    pub content_type: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Success(CompletedDownload),
    Failed(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Success(_) => write!(f, "success"),
            DownloadOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

pub struct DownloadOrchestrator {
    client: Client,
    hls_config: Arc<HlsConfig>,
    uploader: Arc<dyn ArtifactUploader>,
    config: OrchestratorConfig,
    on_progress: Option<OnProgress>,
}

impl DownloadOrchestrator {
    pub fn new(client: Client, uploader: Arc<dyn ArtifactUploader>) -> Self {
        Self {
            client,
            hls_config: Arc::new(HlsConfig::default()),
            uploader,
            config: OrchestratorConfig::default(),
            on_progress: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hls_config(mut self, hls_config: HlsConfig) -> Self {
        self.hls_config = Arc::new(hls_config);
        self
    }

    pub fn with_progress(mut self, on_progress: OnProgress) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one request to its terminal state.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn run(&self, request: DownloadRequest) -> DownloadOutcome {
        self.transition(PipelineState::Start);
        match self.execute(&request).await {
            Ok(completed) => {
                self.transition(PipelineState::Succeeded);
                info!(
                    artifact = %completed.artifact.display(),
                    key = %completed.key,
                    bytes = completed.bytes,
                    "Download pipeline succeeded"
                );
                DownloadOutcome::Success(completed)
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                let reason = failure_reason(&e);
                error!(reason = %reason, "Download pipeline failed");
                DownloadOutcome::Failed(reason)
            }
        }
    }

    async fn execute(&self, request: &DownloadRequest) -> Result<CompletedDownload, DownloadError> {
        request.validate()?;
        let headers = request.header_map();

        self.transition(PipelineState::Classifying);
        let classification = ContentClassifier::new(self.client.clone())
            .classify(&request.url, &headers)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Probe failed, treating resource as generic binary");
                Classification::default()
            });

        let artifact = naming::artifact_path(
            &self.config.downloads_dir,
            request,
            classification.kind,
            classification.extension,
        );

        // Nothing is created on disk until the source is known.
        let source = match classification.kind {
            MediaKind::Playlist => {
                self.transition(PipelineState::PlaylistPath);
                self.plan_playlist(request, &headers).await?
            }
            MediaKind::General => {
                self.transition(PipelineState::GeneralPath);
                Source::Resource
            }
        };

        let mut sink = self.open_artifact(&artifact).await?;
        let bytes = match self.write_artifact(&source, request, &headers, &mut sink).await {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(sink);
                self.discard_partial(&artifact).await;
                return Err(e);
            }
        };
        emit(
            self.on_progress.as_ref(),
            ProgressEvent::ArtifactClosed {
                path: artifact.clone(),
                bytes,
            },
        );

        self.transition(PipelineState::Uploading);
        let key = naming::object_key(&self.config.key_prefix, &artifact);
        let mut destination = Destination::new(&request.destination_bucket, &key);
        if let Some(content_type) = stored_content_type(&classification) {
            destination = destination.with_content_type(content_type);
        }
        self.uploader.upload(&artifact, &destination).await?;

        if self.config.remove_after_upload {
            if let Err(e) = tokio::fs::remove_file(&artifact).await {
                warn!(path = %artifact.display(), error = %e, "Failed to remove uploaded artifact");
            }
        }

        Ok(CompletedDownload {
            artifact,
            bytes,
            kind: classification.kind,
            content_type: classification.content_type,
            key,
        })
    }

    /// Load the media playlist and pick the segments covering the window.
    async fn plan_playlist(
        &self,
        request: &DownloadRequest,
        headers: &HeaderMap,
    ) -> Result<Source, DownloadError> {
        let loader = PlaylistLoader::new(self.client.clone(), self.hls_config.clone());
        let playlist = loader.load(&request.url, headers).await?;

        let segments = parse_segments(&playlist.text);
        let range = select_range(&segments, request.start_seconds, request.end_seconds)
            .ok_or(HlsDownloaderError::EmptySegmentList)?;
        info!(
            segments = segments.len(),
            start_index = range.start_index,
            end_index = range.end_index,
            start_offset = range.start_offset,
            end_offset = range.end_offset,
            "Selected segment range"
        );

        Ok(Source::Segments {
            playlist_url: playlist.url,
            segments: range.slice(&segments).to_vec(),
        })
    }

    async fn write_artifact(
        &self,
        source: &Source,
        request: &DownloadRequest,
        headers: &HeaderMap,
        sink: &mut BufWriter<File>,
    ) -> Result<u64, DownloadError> {
        match source {
            Source::Segments {
                playlist_url,
                segments,
            } => {
                let fetcher = SegmentFetcher::new(self.client.clone(), self.hls_config.clone());
                let bytes = fetcher
                    .fetch(playlist_url, segments, headers, sink, self.on_progress.as_ref())
                    .await?;
                Ok(bytes)
            }
            Source::Resource => {
                RangeDownloader::new(self.client.clone())
                    .download(
                        &request.url,
                        headers,
                        request.byte_range,
                        sink,
                        self.on_progress.as_ref(),
                    )
                    .await
            }
        }
    }

    async fn open_artifact(&self, artifact: &Path) -> Result<BufWriter<File>, DownloadError> {
        if let Some(parent) = artifact.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(artifact).await?;
        debug!(path = %artifact.display(), "Opened artifact");
        emit(
            self.on_progress.as_ref(),
            ProgressEvent::ArtifactOpened {
                path: artifact.to_path_buf(),
            },
        );
        Ok(BufWriter::new(file))
    }

    async fn discard_partial(&self, artifact: &Path) {
        if self.config.keep_failed_artifacts {
            return;
        }
        match tokio::fs::remove_file(artifact).await {
            Ok(()) => debug!(path = %artifact.display(), "Removed partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %artifact.display(), error = %e, "Failed to remove partial artifact"),
        }
    }

    fn transition(&self, state: PipelineState) {
        debug!(state = %state, "Pipeline state changed");
        emit(
            self.on_progress.as_ref(),
            ProgressEvent::StateChanged { state },
        );
    }
}

/// Playlists are stored as concatenated transport stream segments.
fn stored_content_type(classification: &Classification) -> Option<String> {
    match classification.kind {
        MediaKind::Playlist => Some(TRANSPORT_STREAM_CONTENT_TYPE.to_string()),
        MediaKind::General if classification.content_type != DEFAULT_CONTENT_TYPE => {
            Some(classification.content_type.clone())
        }
        MediaKind::General => None,
    }
}

/// Reason text for a failed outcome; HLS errors surface without the wrapper
/// prefix.
fn failure_reason(error: &DownloadError) -> String {
    match error {
        DownloadError::HlsError(e) => e.to_string(),
        e => e.to_string(),
    }
}
