//! Hand-off of finished artifacts to storage.

mod local;
mod s3;

use std::path::Path;

use async_trait::async_trait;

pub use local::LocalDirUploader;
pub use s3::S3Uploader;

/// Where an artifact ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub key: String,
    /// Content type stored alongside the object, when the backend keeps one.
    pub content_type: Option<String>,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stores a local file under a key.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(&self, artifact: &Path, destination: &Destination) -> Result<(), UploadError>;
}
