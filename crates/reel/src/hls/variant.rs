use m3u8_rs::{Playlist, VariantStream, parse_playlist_res};
use tracing::debug;

use crate::hls::HlsDownloaderError;

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VariantSelectionPolicy {
    #[default]
    HighestBitrate, // Select the variant with the highest bandwidth
    LowestBitrate,
    ClosestToBitrate(u64), // Select variant closest to the specified bitrate
}

/// Whether the text lists variant streams rather than media segments.
pub fn is_master_playlist(text: &str) -> bool {
    text.lines()
        .any(|line| line.trim_start().starts_with(STREAM_INF_TAG))
}

/// Pick a variant from master playlist text and return its URI as written.
pub fn select_variant_uri(
    text: &str,
    policy: &VariantSelectionPolicy,
) -> Result<String, HlsDownloaderError> {
    let master = match parse_playlist_res(text.as_bytes()) {
        Ok(Playlist::MasterPlaylist(master)) => master,
        Ok(Playlist::MediaPlaylist(_)) => {
            return Err(HlsDownloaderError::PlaylistError(
                "expected a master playlist, got a media playlist".to_string(),
            ));
        }
        Err(e) => {
            return Err(HlsDownloaderError::PlaylistError(format!(
                "Failed to parse master playlist: {e}"
            )));
        }
    };

    let candidates: Vec<&VariantStream> = master
        .variants
        .iter()
        .filter(|variant| !variant.is_i_frame)
        .collect();

    let selected = match policy {
        VariantSelectionPolicy::HighestBitrate => {
            candidates.iter().max_by_key(|v| v.bandwidth)
        }
        VariantSelectionPolicy::LowestBitrate => candidates.iter().min_by_key(|v| v.bandwidth),
        VariantSelectionPolicy::ClosestToBitrate(target) => candidates
            .iter()
            .min_by_key(|v| v.bandwidth.abs_diff(*target)),
    }
    .ok_or_else(|| HlsDownloaderError::PlaylistError("Master playlist has no variants".to_string()))?;

    debug!(
        uri = %selected.uri,
        bandwidth = selected.bandwidth,
        policy = ?policy,
        "Selected variant stream"
    );
    Ok(selected.uri.clone())
}
