use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Fetch remote media into object storage",
    long_about = "Fetch remote media and store it in a bucket.\n\
                  \n\
                  HLS playlists can be trimmed to a time window (only the segments covering\n\
                  the window are downloaded and concatenated), any other resource can be\n\
                  limited to its first N bytes. The resulting file is uploaded to S3 or\n\
                  copied into a local directory tree.\n\
                  \n\
                  The mux command downloads an audio and a video source and merges them\n\
                  with ffmpeg."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Show progress bars for operations
    #[arg(
        short = 'P',
        long = "progress",
        global = true,
        help = "Show progress bars for downloads and muxing"
    )]
    pub show_progress: bool,

    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download a resource (optionally trimmed) and upload it
    Fetch(FetchArgs),
    /// Download an audio and a video source and merge them with ffmpeg
    Mux(MuxArgs),
}

/// HTTP client settings shared by every command
#[derive(Args)]
pub struct HttpArgs {
    /// Overall timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "0",
        help = "Overall timeout in seconds for HTTP requests (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        help = "Read timeout in seconds (maximum time between receiving data chunks)"
    )]
    pub read_timeout: u64,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        global = true,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy type (http, https, socks5, all)
    #[arg(
        long,
        global = true,
        default_value = "http",
        help = "Proxy type (http, https, socks5, all)",
        value_parser = ["http", "https", "socks5", "all"]
    )]
    pub proxy_type: String,

    /// Proxy username
    #[arg(long, global = true, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, global = true, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        global = true,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    /// Accept any TLS certificate
    #[arg(
        long,
        global = true,
        help = "Skip TLS certificate verification (self-signed or misconfigured hosts)"
    )]
    pub insecure: bool,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        global = true,
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Directory for local artifacts
    #[arg(
        long,
        global = true,
        default_value = "downloads",
        help = "Directory where downloaded files are written before upload"
    )]
    pub downloads_dir: PathBuf,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Resource to download
    #[arg(
        required_unless_present = "request_file",
        help = "URL of an HLS playlist or any other HTTP resource"
    )]
    pub url: Option<String>,

    /// Load the whole request from a JSON file
    #[arg(
        long,
        conflicts_with_all = ["url", "bucket", "filename", "start", "end", "byte_range"],
        help = "Read the request from a JSON file (url, headers, filename, startSeconds, endSeconds, byteRange, destinationBucket)"
    )]
    pub request_file: Option<PathBuf>,

    /// Destination bucket
    #[arg(
        short,
        long,
        required_unless_present = "request_file",
        help = "Bucket (or top-level directory for --store local) receiving the file"
    )]
    pub bucket: Option<String>,

    /// Base name of the local file
    #[arg(short = 'n', long, help = "Base name for the downloaded file (defaults to the URL's file name)")]
    pub filename: Option<String>,

    /// Playlist window start
    #[arg(
        short,
        long,
        help = "Start of the playlist window with optional unit (s, m, h). Examples: \"90\", \"1.5m\""
    )]
    pub start: Option<String>,

    /// Playlist window end
    #[arg(
        short,
        long,
        help = "End of the playlist window with optional unit (s, m, h). Examples: \"300\", \"5m\""
    )]
    pub end: Option<String>,

    /// Leading bytes to fetch from non-playlist resources
    #[arg(
        short = 'r',
        long,
        help = "Fetch only the first N bytes of a non-playlist resource, with optional unit (B, KB, MB, GB). Examples: \"100000\", \"512KB\""
    )]
    pub byte_range: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = Store::S3, help = "Where finished files are uploaded")]
    pub store: Store,

    /// Root directory for --store local
    #[arg(long, default_value = "store", help = "Root directory used by --store local")]
    pub local_root: PathBuf,

    /// AWS region override
    #[arg(long, help = "AWS region (defaults to the environment / profile configuration)")]
    pub region: Option<String>,

    /// S3-compatible endpoint
    #[arg(long, help = "Custom S3 endpoint URL, e.g. a MinIO server")]
    pub endpoint: Option<String>,

    /// Object key prefix
    #[arg(long, default_value = "reel", help = "Prefix for uploaded object keys")]
    pub key_prefix: String,

    /// Keep partially downloaded files
    #[arg(long, help = "Keep the partial file when a download fails")]
    pub keep_failed: bool,

    /// Delete local files after upload
    #[arg(long, help = "Delete the local file once it was uploaded")]
    pub remove_after_upload: bool,

    /// Segment retry attempts for HLS downloads
    #[arg(
        long,
        default_value = "0",
        help = "Number of retry attempts for failed HLS segment downloads (connection errors and 5xx only)"
    )]
    pub segment_retries: u32,

    /// HLS segment timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Timeout for individual HLS segment downloads in seconds (0 disables it)"
    )]
    pub segment_timeout: u64,

    /// Variant selection for master playlists
    #[arg(
        long,
        default_value = "highest",
        help = "Variant to follow in master playlists: highest, lowest, or a target bitrate in bits/s"
    )]
    pub variant: String,
}

#[derive(Args)]
pub struct MuxArgs {
    /// Audio source
    #[arg(long, help = "URL of the source providing the audio track")]
    pub audio: String,

    /// Video source
    #[arg(long, help = "URL of the source providing the video track")]
    pub video: String,

    /// Output file
    #[arg(short, long, help = "Merged output file; the extension selects the container")]
    pub output: PathBuf,

    /// ffmpeg binary
    #[arg(long, default_value = "ffmpeg", help = "ffmpeg executable to run")]
    pub ffmpeg: String,

    /// Keep the downloaded inputs
    #[arg(long, help = "Keep the downloaded audio and video files after muxing")]
    pub keep_inputs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Store {
    /// Amazon S3 or an S3-compatible service
    S3,
    /// A local directory tree: <root>/<bucket>/<key>
    Local,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_arguments() {
        let args = CliArgs::try_parse_from([
            "reel",
            "fetch",
            "https://cdn.example.com/live.m3u8",
            "--bucket",
            "media",
            "--start",
            "15",
            "--end",
            "1m",
            "-H",
            "Referer: https://example.com",
            "--insecure",
            "--store",
            "local",
        ])
        .unwrap();

        assert!(args.http.insecure);
        assert_eq!(args.http.headers, vec!["Referer: https://example.com"]);
        let Command::Fetch(fetch) = args.command else {
            panic!("expected fetch");
        };
        assert_eq!(fetch.url.as_deref(), Some("https://cdn.example.com/live.m3u8"));
        assert_eq!(fetch.bucket.as_deref(), Some("media"));
        assert_eq!(fetch.start.as_deref(), Some("15"));
        assert_eq!(fetch.end.as_deref(), Some("1m"));
        assert_eq!(fetch.store, Store::Local);
        assert_eq!(fetch.key_prefix, "reel");
        assert_eq!(fetch.segment_retries, 0);
    }

    #[test]
    fn test_fetch_requires_bucket_without_request_file() {
        assert!(CliArgs::try_parse_from(["reel", "fetch", "https://a.example/x.mp4"]).is_err());
        assert!(CliArgs::try_parse_from(["reel", "fetch", "--request-file", "job.json"]).is_ok());
    }

    #[test]
    fn test_mux_arguments() {
        let args = CliArgs::try_parse_from([
            "reel",
            "mux",
            "--audio",
            "https://a.example/audio.weba",
            "--video",
            "https://a.example/video.mp4",
            "-o",
            "out.mkv",
        ])
        .unwrap();
        let Command::Mux(mux) = args.command else {
            panic!("expected mux");
        };
        assert_eq!(mux.output, PathBuf::from("out.mkv"));
        assert_eq!(mux.ffmpeg, "ffmpeg");
        assert!(!args.http.insecure);
    }
}
