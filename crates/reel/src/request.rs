use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::warn;

use crate::DownloadError;

/// A single download job.
///
/// Time bounds only apply to playlist resources and `byte_range` only to
/// everything else. A request may carry both; the classifier decides which
/// one is honoured.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Base name for the local artifact.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub start_seconds: Option<f64>,
    #[serde(default)]
    pub end_seconds: Option<f64>,
    /// Number of leading bytes to fetch.
    #[serde(default)]
    pub byte_range: Option<u64>,
    pub destination_bucket: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination_bucket: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            filename: None,
            start_seconds: None,
            end_seconds: None,
            byte_range: None,
            destination_bucket: destination_bucket.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_time_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_seconds = start;
        self.end_seconds = end;
        self
    }

    pub fn with_byte_range(mut self, length: u64) -> Self {
        self.byte_range = Some(length);
        self
    }

    /// Parse a request from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, DownloadError> {
        let request: Self = serde_json::from_str(json)
            .map_err(|e| DownloadError::InvalidRequest(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Reject requests that can never succeed.
    pub fn validate(&self) -> Result<(), DownloadError> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| DownloadError::InvalidRequest(format!("url {}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidRequest(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        if self.destination_bucket.trim().is_empty() {
            return Err(DownloadError::InvalidRequest(
                "destination bucket is empty".to_string(),
            ));
        }
        for (label, bound) in [("start", self.start_seconds), ("end", self.end_seconds)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(DownloadError::InvalidRequest(format!(
                        "{label} bound must be a non-negative number, got {value}"
                    )));
                }
            }
        }
        if self.byte_range == Some(0) {
            return Err(DownloadError::InvalidRequest(
                "byte range length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-request headers as a `HeaderMap`; invalid entries are skipped.
    pub fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid request header"),
            }
        }
        headers
    }
}
