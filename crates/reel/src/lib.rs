//! # Reel
//!
//! A library for fetching remote media into a local artifact and handing it
//! to object storage. Supports HLS playlists (with time-window trimming) and
//! plain HTTP resources (with byte-range trimming).
//!
//! ## Features
//!
//! - Content-type probing with HEAD and a one-byte ranged GET fallback
//! - Lenient HLS playlist scanning and master playlist variant selection
//! - Time-window to segment-range mapping
//! - Sequential, streamed segment concatenation
//! - Streamed byte-range downloads that tolerate servers without range support
//! - Pluggable upload backends (S3, local directory)
//! - An ffmpeg mux driver with structured progress

pub mod builder;
pub mod classify;
pub mod config;
pub mod downloader;
pub mod error;
pub mod hls;
pub mod mux;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod proxy;
pub mod range_download;
pub mod request;
pub mod upload;

pub use builder::DownloaderConfigBuilder;
pub use classify::{Classification, ContentClassifier, MediaKind};
pub use config::DownloaderConfig;
pub use downloader::create_client;
pub use error::DownloadError;
pub use mux::{MuxError, MuxJob, MuxProgress};
pub use orchestrator::{
    CompletedDownload, DownloadOrchestrator, DownloadOutcome, OrchestratorConfig, PipelineState,
};
pub use progress::{OnProgress, ProgressEvent};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use range_download::RangeDownloader;
pub use request::DownloadRequest;
pub use upload::{ArtifactUploader, Destination, LocalDirUploader, S3Uploader, UploadError};
