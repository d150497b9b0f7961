//! Single-GET download path for everything that is not a playlist.

use futures::StreamExt;
use reqwest::header::{HeaderMap, RANGE};
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use crate::DownloadError;
use crate::progress::{OnProgress, ProgressEvent, emit};

/// `Range` header value asking for the first `length` bytes.
pub fn range_header_value(length: u64) -> String {
    format!("bytes=0-{}", length.saturating_sub(1))
}

/// Copy of `headers` without any `Range` entry, so the prefix request
/// carries exactly one.
pub(crate) fn without_range(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    headers.remove(RANGE);
    headers
}

#[derive(Clone)]
pub struct RangeDownloader {
    client: Client,
}

impl RangeDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Stream `url` into `sink`, optionally limited to its first
    /// `byte_range` bytes. Returns the number of bytes written.
    #[instrument(skip(self, headers, sink, on_progress), level = "debug")]
    pub async fn download<W>(
        &self,
        url: &str,
        headers: &HeaderMap,
        byte_range: Option<u64>,
        sink: &mut W,
        on_progress: Option<&OnProgress>,
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let request = match byte_range {
            Some(length) => self
                .client
                .get(url)
                .headers(without_range(headers))
                .header(RANGE, range_header_value(length)),
            None => self.client.get(url).headers(headers.clone()),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::StatusCode(status));
        }

        // A server without range support answers 200 with the whole body.
        let limit = match byte_range {
            Some(length) if status != StatusCode::PARTIAL_CONTENT => {
                warn!(
                    status = %status,
                    "Server ignored the Range header, truncating the body locally"
                );
                Some(length)
            }
            other => other,
        };

        let total = match (response.content_length(), limit) {
            (Some(announced), Some(limit)) => Some(announced.min(limit)),
            (announced, None) => announced,
            (None, limit) => limit,
        };
        if let Some(total) = total {
            debug!(total, "Expected download size");
        }

        let mut downloaded = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                DownloadError::StreamError(format!("after {downloaded} bytes: {e}"))
            })?;

            let take = match limit {
                Some(limit) => (limit - downloaded).min(chunk.len() as u64) as usize,
                None => chunk.len(),
            };
            sink.write_all(&chunk[..take]).await?;
            downloaded += take as u64;

            emit(
                on_progress,
                ProgressEvent::BytesReceived { downloaded, total },
            );

            if limit.is_some_and(|limit| downloaded >= limit) {
                break;
            }
        }

        sink.flush().await?;
        info!(url, bytes = downloaded, "Download finished");
        Ok(downloaded)
    }
}
