use std::path::PathBuf;
use std::sync::Arc;

use crate::orchestrator::PipelineState;

/// Observable side effects of a download pipeline.
///
/// The engine never renders anything itself; callers decide whether these
/// become progress bars, log lines or nothing at all.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The pipeline moved to a new state.
    StateChanged {
        state: PipelineState,
    },
    /// A local artifact was created and is about to receive bytes.
    ArtifactOpened {
        path: PathBuf,
    },
    /// One playlist segment was appended to the artifact.
    SegmentFetched {
        /// 1-based position within the selected range.
        index: usize,
        total: usize,
        bytes: u64,
    },
    /// Bytes streamed so far on the general path.
    BytesReceived {
        downloaded: u64,
        /// Total expected bytes, if the server announced a length.
        total: Option<u64>,
    },
    /// The artifact was flushed and closed.
    ArtifactClosed {
        path: PathBuf,
        bytes: u64,
    },
}

/// A callback function for progress updates.
pub type OnProgress = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[inline]
pub(crate) fn emit(on_progress: Option<&OnProgress>, event: ProgressEvent) {
    if let Some(callback) = on_progress {
        callback(event);
    }
}
