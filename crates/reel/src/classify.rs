//! # Content classification
//!
//! Decides whether a URL points at an HLS playlist or an opaque binary and
//! which file extension the local artifact should carry.

use reqwest::header::{CONTENT_TYPE, HeaderMap, RANGE};
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};

use crate::DownloadError;
use crate::range_download::without_range;

/// Content type reported when a server does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "default-content-type";

/// Extension used for anything not in the lookup table.
pub const DEFAULT_EXTENSION: &str = ".bin";

const PLAYLIST_CONTENT_TYPES: [&str; 2] = ["application/vnd.apple.mpegurl", "application/x-mpegurl"];

const EXTENSIONS: &[(&str, &str)] = &[
    (DEFAULT_CONTENT_TYPE, ".bin"),
    ("application/vnd.apple.mpegurl", ".ts"),
    ("application/x-mpegurl", ".ts"),
    ("video/mp4", ".mp4"),
    ("video/x-matroska", ".mkv"),
    ("video/webm", ".webm"),
    ("video/3gpp", ".3gp"),
    ("video/3gpp2", ".3g2"),
    ("video/ogg", ".ogv"),
    ("video/quicktime", ".mov"),
    ("video/x-msvideo", ".avi"),
    ("video/x-ms-wmv", ".wmv"),
    ("audio/mpeg", ".mp3"),
    ("audio/aac", ".aac"),
    ("audio/ogg", ".ogg"),
    ("audio/x-wav", ".wav"),
    ("audio/x-flac", ".flac"),
    ("audio/webm", ".weba"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/tiff", ".tiff"),
    ("image/x-icon", ".ico"),
    ("application/pdf", ".pdf"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("text/csv", ".csv"),
    ("text/plain", ".txt"),
    ("application/zip", ".zip"),
    ("application/x-tar", ".tar"),
    ("application/x-gzip", ".gz"),
    ("application/x-rar-compressed", ".rar"),
    ("application/gzip", ".tar.gz"),
    ("application/x-7z-compressed", ".7z"),
    ("text/html", ".html"),
];

/// Which download path a resource takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// HLS playlist: time-window selection, segment concatenation.
    Playlist,
    /// Anything else: single streamed GET, optional byte range.
    General,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Playlist => write!(f, "playlist"),
            MediaKind::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Content type as the server reported it.
    pub content_type: String,
    pub extension: &'static str,
    pub kind: MediaKind,
}

impl Classification {
    pub fn from_content_type(content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        Self {
            extension: extension_for(&content_type),
            kind: kind_for(&content_type),
            content_type,
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::from_content_type(DEFAULT_CONTENT_TYPE)
    }
}

/// MIME type without parameters, lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn extension_for(content_type: &str) -> &'static str {
    let essence = essence(content_type);
    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .unwrap_or(DEFAULT_EXTENSION)
}

pub fn kind_for(content_type: &str) -> MediaKind {
    if PLAYLIST_CONTENT_TYPES.contains(&essence(content_type).as_str()) {
        MediaKind::Playlist
    } else {
        MediaKind::General
    }
}

/// Probes remote resources with HEAD, falling back to a one-byte GET.
#[derive(Clone)]
pub struct ContentClassifier {
    client: Client,
}

impl ContentClassifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Probe `url` and classify it.
    ///
    /// Fails with [`DownloadError::ProbeFailure`] only when both the HEAD
    /// and the ranged GET fail; callers are expected to fall back to
    /// [`Classification::default`] in that case.
    #[instrument(skip(self, headers), level = "debug")]
    pub async fn classify(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Classification, DownloadError> {
        let content_type = match self.head(url, headers).await {
            Ok(content_type) => content_type,
            Err(head_err) => {
                debug!(error = %head_err, "HEAD probe failed, retrying with a ranged GET");
                self.first_byte(url, headers).await.map_err(|get_err| {
                    warn!(error = %get_err, "Ranged GET probe failed");
                    DownloadError::ProbeFailure(format!("HEAD: {head_err}; GET: {get_err}"))
                })?
            }
        };

        let classification = Classification::from_content_type(content_type);
        debug!(
            content_type = %classification.content_type,
            extension = classification.extension,
            kind = %classification.kind,
            "Classified resource"
        );
        Ok(classification)
    }

    async fn head(&self, url: &str, headers: &HeaderMap) -> Result<String, DownloadError> {
        let response = self.client.head(url).headers(headers.clone()).send().await?;
        content_type_of(response)
    }

    async fn first_byte(&self, url: &str, headers: &HeaderMap) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .headers(without_range(headers))
            .header(RANGE, "bytes=0-0")
            .send()
            .await?;
        content_type_of(response)
    }
}

fn content_type_of(response: Response) -> Result<String, DownloadError> {
    if !response.status().is_success() {
        return Err(DownloadError::StatusCode(response.status()));
    }
    Ok(response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_types_route_to_playlist() {
        for content_type in [
            "application/vnd.apple.mpegurl",
            "application/x-mpegURL",
            "application/vnd.apple.mpegurl; charset=UTF-8",
        ] {
            let classification = Classification::from_content_type(content_type);
            assert_eq!(classification.kind, MediaKind::Playlist, "{content_type}");
            assert_eq!(classification.extension, ".ts");
        }
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(extension_for("video/mp4"), ".mp4");
        assert_eq!(extension_for("Video/X-Matroska"), ".mkv");
        assert_eq!(extension_for("application/gzip"), ".tar.gz");
        assert_eq!(extension_for("text/plain; charset=utf-8"), ".txt");
        assert_eq!(extension_for("application/octet-stream"), ".bin");
        assert_eq!(extension_for(DEFAULT_CONTENT_TYPE), ".bin");
    }

    #[test]
    fn test_default_classification() {
        let classification = Classification::default();
        assert_eq!(classification.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(classification.extension, ".bin");
        assert_eq!(classification.kind, MediaKind::General);
    }

    #[test]
    fn test_raw_content_type_is_preserved() {
        let classification = Classification::from_content_type("video/MP4; codecs=avc1");
        assert_eq!(classification.content_type, "video/MP4; codecs=avc1");
        assert_eq!(classification.extension, ".mp4");
    }
}
