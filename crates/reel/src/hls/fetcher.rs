// HLS Segment Fetcher: sequential download of the selected segments into one sink.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::parser::PlaylistSegment;
use crate::progress::{OnProgress, ProgressEvent, emit};

/// Resolve a segment reference against the playlist URL.
///
/// Relative references land in the playlist's directory; absolute ones
/// pass through untouched.
pub fn resolve_segment_url(playlist_url: &Url, reference: &str) -> Result<Url, HlsDownloaderError> {
    playlist_url.join(reference).map_err(|e| {
        HlsDownloaderError::PlaylistError(format!(
            "Could not join playlist URL {playlist_url} with segment URI {reference}: {e}"
        ))
    })
}

pub struct SegmentFetcher {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl SegmentFetcher {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Fetch `segments` in listing order and append each body to `sink` as
    /// it streams in. Returns the number of bytes written.
    ///
    /// The first failing segment aborts the whole fetch; whatever was already
    /// written stays in the sink and is the caller's to discard.
    #[instrument(skip_all, fields(playlist = %playlist_url, segments = segments.len()))]
    pub async fn fetch<W>(
        &self,
        playlist_url: &Url,
        segments: &[PlaylistSegment],
        headers: &HeaderMap,
        sink: &mut W,
        on_progress: Option<&OnProgress>,
    ) -> Result<u64, HlsDownloaderError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let urls = segments
            .iter()
            .map(|segment| resolve_segment_url(playlist_url, &segment.reference))
            .collect::<Result<Vec<_>, _>>()?;

        let total = urls.len();
        let mut total_bytes = 0u64;
        for (position, url) in urls.iter().enumerate() {
            let bytes = self.fetch_segment(url, headers, sink).await?;
            total_bytes += bytes;

            debug!(url = %url, bytes, "Downloaded segment {} of {}", position + 1, total);
            emit(
                on_progress,
                ProgressEvent::SegmentFetched {
                    index: position + 1,
                    total,
                    bytes,
                },
            );
        }

        sink.flush().await?;
        info!(segments = total, bytes = total_bytes, "All segments downloaded");
        Ok(total_bytes)
    }

    /// Download one segment into the sink.
    ///
    /// Connection failures, timeouts and 5xx responses are retried up to
    /// `max_segment_retries` times before any byte is written. 4xx responses
    /// and failures in the middle of a body are final.
    async fn fetch_segment<W>(
        &self,
        segment_url: &Url,
        headers: &HeaderMap,
        sink: &mut W,
    ) -> Result<u64, HlsDownloaderError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let fetcher_config = &self.config.fetcher_config;
        let mut attempts = 0u32;

        let response = loop {
            attempts += 1;
            let mut request_builder = self
                .http_client
                .get(segment_url.clone())
                .headers(headers.clone());
            if !fetcher_config.segment_download_timeout.is_zero() {
                request_builder = request_builder.timeout(fetcher_config.segment_download_timeout);
            }

            match request_builder.send().await {
                Ok(response) if response.status().is_success() => break response,
                Ok(response) if response.status().is_client_error() => {
                    return Err(HlsDownloaderError::SegmentFetchError(format!(
                        "Client error {} for segment {segment_url}",
                        response.status()
                    )));
                }
                Ok(response) => {
                    if attempts > fetcher_config.max_segment_retries {
                        return Err(HlsDownloaderError::SegmentFetchError(format!(
                            "Segment {segment_url} failed with status {} after {attempts} attempt(s)",
                            response.status()
                        )));
                    }
                    warn!(url = %segment_url, status = %response.status(), attempts, "Retrying segment");
                }
                Err(e) => {
                    let retryable = e.is_connect() || e.is_timeout();
                    if !retryable || attempts > fetcher_config.max_segment_retries {
                        return Err(HlsDownloaderError::SegmentFetchError(format!(
                            "Failed to fetch segment {segment_url}: {e}"
                        )));
                    }
                    warn!(url = %segment_url, error = %e, attempts, "Retrying segment");
                }
            }

            let delay = fetcher_config.segment_retry_delay_base * (1u32 << (attempts - 1).min(6));
            tokio::time::sleep(delay).await;
        };

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                HlsDownloaderError::SegmentFetchError(format!(
                    "Segment {segment_url} interrupted after {written} bytes: {e}"
                ))
            })?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }
}
