use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{ArtifactUploader, Destination, UploadError};

/// Copies artifacts into `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalDirUploader {
    root: PathBuf,
}

impl LocalDirUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Target path for a destination. Keys may not climb out of the bucket.
    pub fn target_path(&self, destination: &Destination) -> Result<PathBuf, UploadError> {
        let mut target = self.root.clone();
        for part in [destination.bucket.as_str(), destination.key.as_str()] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(segment) => target.push(segment),
                    Component::CurDir | Component::RootDir => {}
                    Component::ParentDir | Component::Prefix(_) => {
                        return Err(UploadError::Storage(format!(
                            "Refusing to store outside the upload root: {part}"
                        )));
                    }
                }
            }
        }
        if target == self.root {
            return Err(UploadError::Storage("Empty destination".to_string()));
        }
        Ok(target)
    }
}

#[async_trait]
impl ArtifactUploader for LocalDirUploader {
    #[instrument(skip(self), fields(bucket = %destination.bucket, key = %destination.key))]
    async fn upload(&self, artifact: &Path, destination: &Destination) -> Result<(), UploadError> {
        let target = self.target_path(destination)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(artifact, &target).await?;
        debug!(target = %target.display(), bytes, "Copied artifact");
        Ok(())
    }
}
