use crate::hls::parser::PlaylistSegment;

/// Inclusive segment window chosen for a requested time range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedRange {
    pub start_index: usize,
    pub end_index: usize,
    /// Playlist time at which the start segment begins.
    pub start_offset: f64,
    /// Playlist time at which the end segment ends.
    pub end_offset: f64,
}

impl SelectedRange {
    pub fn segment_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// The selected slice of `segments`.
    pub fn slice<'a>(&self, segments: &'a [PlaylistSegment]) -> &'a [PlaylistSegment] {
        &segments[self.start_index..=self.end_index]
    }

    pub fn duration(&self) -> f64 {
        self.end_offset - self.start_offset
    }
}

/// Map `[start_seconds, end_seconds)` onto a contiguous run of segments.
///
/// A segment contains `t` when `offset <= t < offset + duration`; the first
/// such segment wins. Missing bounds select from the first / through the
/// last segment. Bounds past the end of the playlist resolve to the last
/// segment instead of failing, negative bounds count as zero, and an end
/// falling before the start collapses onto the start segment.
///
/// Returns `None` only for an empty playlist.
pub fn select_range(
    segments: &[PlaylistSegment],
    start_seconds: Option<f64>,
    end_seconds: Option<f64>,
) -> Option<SelectedRange> {
    let last = segments.len().checked_sub(1)?;

    let start_index = match start_seconds {
        None => 0,
        Some(start) => locate(segments, start.max(0.0)).unwrap_or(last),
    };
    let end_index = match end_seconds {
        None => last,
        Some(end) => locate(segments, end.max(0.0)).unwrap_or(last),
    }
    .max(start_index);

    let start_offset: f64 = segments[..start_index].iter().map(|s| s.duration).sum();
    let end_offset: f64 = segments[..=end_index].iter().map(|s| s.duration).sum();

    Some(SelectedRange {
        start_index,
        end_index,
        start_offset,
        end_offset,
    })
}

/// Index of the first segment whose span contains `time`.
fn locate(segments: &[PlaylistSegment], time: f64) -> Option<usize> {
    let mut total_time = 0.0;
    for (index, segment) in segments.iter().enumerate() {
        if total_time <= time && time < total_time + segment.duration {
            return Some(index);
        }
        total_time += segment.duration;
    }
    None
}
