use std::time::Duration;

use crate::hls::variant::VariantSelectionPolicy;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    pub playlist_config: HlsPlaylistConfig,
    pub fetcher_config: HlsFetcherConfig,
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    pub playlist_fetch_timeout: Duration,
    pub variant_selection_policy: VariantSelectionPolicy,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_fetch_timeout: Duration::from_secs(15),
            variant_selection_policy: VariantSelectionPolicy::default(),
        }
    }
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    /// Per-segment timeout; zero leaves only the client-level timeouts.
    pub segment_download_timeout: Duration,
    /// Extra attempts per segment. Zero keeps fetching all-or-nothing with
    /// no retry at all.
    pub max_segment_retries: u32,
    pub segment_retry_delay_base: Duration, // Base for exponential backoff
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Duration::ZERO,
            max_segment_retries: 0,
            segment_retry_delay_base: Duration::from_millis(500),
        }
    }
}
