// HLS playlist loading: fetch the text, follow one master -> media hop.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, info, instrument};
use url::Url;

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use crate::hls::variant::{is_master_playlist, select_variant_uri};

/// Media playlist text together with the URL its references resolve against.
#[derive(Debug, Clone)]
pub struct MediaPlaylistText {
    pub url: Url,
    pub text: String,
}

pub struct PlaylistLoader {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl PlaylistLoader {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Fetch a playlist. A master playlist is resolved to one of its media
    /// playlists according to the configured variant policy.
    #[instrument(skip(self, headers), level = "debug")]
    pub async fn load(
        &self,
        url_str: &str,
        headers: &HeaderMap,
    ) -> Result<MediaPlaylistText, HlsDownloaderError> {
        let playlist_url = Url::parse(url_str).map_err(|e| {
            HlsDownloaderError::PlaylistError(format!("Invalid playlist URL {url_str}: {e}"))
        })?;
        let text = self.fetch_text(&playlist_url, headers).await?;

        if !is_master_playlist(&text) {
            return Ok(MediaPlaylistText {
                url: playlist_url,
                text,
            });
        }

        let variant_uri = select_variant_uri(
            &text,
            &self.config.playlist_config.variant_selection_policy,
        )?;
        let media_url = playlist_url.join(&variant_uri).map_err(|e| {
            HlsDownloaderError::PlaylistError(format!(
                "Could not join master URL with variant URI {variant_uri}: {e}"
            ))
        })?;
        info!(media_playlist = %media_url, "Resolved master playlist to media playlist");

        let media_text = self.fetch_text(&media_url, headers).await?;
        if is_master_playlist(&media_text) {
            return Err(HlsDownloaderError::PlaylistError(format!(
                "Variant {media_url} is itself a master playlist"
            )));
        }

        Ok(MediaPlaylistText {
            url: media_url,
            text: media_text,
        })
    }

    async fn fetch_text(&self, url: &Url, headers: &HeaderMap) -> Result<String, HlsDownloaderError> {
        let mut request = self.http_client.get(url.clone()).headers(headers.clone());
        let timeout = self.config.playlist_config.playlist_fetch_timeout;
        if !timeout.is_zero() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            HlsDownloaderError::PlaylistError(format!("Failed to fetch playlist {url}: {e}"))
        })?;
        if !response.status().is_success() {
            return Err(HlsDownloaderError::PlaylistError(format!(
                "Failed to fetch playlist {url}: HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            HlsDownloaderError::PlaylistError(format!("Failed to read playlist {url}: {e}"))
        })?;
        debug!(url = %url, size = bytes.len(), "Fetched playlist");

        String::from_utf8(bytes.to_vec()).map_err(|e| {
            HlsDownloaderError::PlaylistError(format!("Playlist content is not valid UTF-8: {e}"))
        })
    }
}
