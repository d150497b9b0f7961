use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{info, instrument};

use super::{ArtifactUploader, Destination, UploadError};

/// Uploads artifacts with `PutObject`.
#[derive(Clone)]
pub struct S3Uploader {
    client: S3Client,
}

impl S3Uploader {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS provider chain (environment,
    /// profile, instance metadata).
    ///
    /// `endpoint` points the client at an S3-compatible service and switches
    /// to path-style addressing.
    pub async fn from_env(region: Option<String>, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(endpoint) = endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint.is_some())
            .build();
        Self::new(S3Client::from_conf(s3_config))
    }
}

#[async_trait]
impl ArtifactUploader for S3Uploader {
    #[instrument(skip(self), fields(bucket = %destination.bucket, key = %destination.key))]
    async fn upload(&self, artifact: &Path, destination: &Destination) -> Result<(), UploadError> {
        let body = ByteStream::from_path(artifact).await.map_err(|e| {
            UploadError::Storage(format!("Failed to open {}: {e}", artifact.display()))
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .body(body);
        if let Some(content_type) = &destination.content_type {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|e| UploadError::Storage(DisplayErrorContext(&e).to_string()))?;

        info!("Uploaded artifact to s3://{}/{}", destination.bucket, destination.key);
        Ok(())
    }
}
