// HLS support: playlist scanning, time-window selection and segment concatenation

pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod playlist;
pub mod range;
pub mod variant;

// Re-exports for easier access
pub use config::{HlsConfig, HlsFetcherConfig, HlsPlaylistConfig};
pub use error::HlsDownloaderError;
pub use fetcher::SegmentFetcher;
pub use parser::{PlaylistSegment, parse_segments};
pub use playlist::{MediaPlaylistText, PlaylistLoader};
pub use range::{SelectedRange, select_range};
pub use variant::VariantSelectionPolicy;
