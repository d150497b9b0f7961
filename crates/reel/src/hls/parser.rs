//! Line scanner that extracts `(duration, reference)` pairs from a media
//! playlist. Only what range selection needs is read; version, target
//! duration and end-list tags are ignored.

use tracing::warn;

const EXTINF_PREFIX: &str = "#EXTINF:";

/// One timed entry of a media playlist, in listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSegment {
    /// Seconds, never negative.
    pub duration: f64,
    /// URI as written in the playlist, relative to the playlist URL.
    pub reference: String,
}

impl PlaylistSegment {
    pub fn new(duration: f64, reference: impl Into<String>) -> Self {
        Self {
            duration,
            reference: reference.into(),
        }
    }
}

/// Scan playlist text into segments.
///
/// Never fails: odd input yields an empty or partial list. An `#EXTINF`
/// whose URI never shows up (another `#EXTINF` comes first, or the text
/// ends) is dropped.
pub fn parse_segments(text: &str) -> Vec<PlaylistSegment> {
    let mut segments = Vec::new();
    let mut pending: Option<f64> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(EXTINF_PREFIX) {
            if pending.is_some() {
                warn!("#EXTINF without a segment URI, dropping it");
            }
            pending = Some(parse_duration(rest));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if let Some(duration) = pending.take() {
            segments.push(PlaylistSegment::new(duration, line));
        }
    }

    segments
}

/// `10.010,Title` -> 10.01; garbage -> 0.0
fn parse_duration(value: &str) -> f64 {
    let number = value.split(',').next().unwrap_or_default().trim();
    match number.parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration >= 0.0 => duration,
        _ => {
            warn!(value = %value, "Unparseable #EXTINF duration, treating it as 0");
            0.0
        }
    }
}

/// Total duration of a segment list in seconds.
pub fn total_duration(segments: &[PlaylistSegment]) -> f64 {
    segments.iter().map(|segment| segment.duration).sum()
}
