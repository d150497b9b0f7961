use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::proxy::ProxyConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// HTTP client settings for probes, playlists, segments and byte-range
/// downloads alike.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Cap on a whole request including its body. Zero means none.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Longest silence allowed between two body chunks.
    pub read_timeout: Duration,
    pub user_agent: String,
    /// Sent with every request unless the request sets the same header.
    pub headers: HeaderMap,
    pub proxy: Option<ProxyConfig>,
    /// Ignored when `proxy` is set.
    pub use_system_proxy: bool,
    /// Accept any server certificate. Off unless asked for.
    pub danger_accept_invalid_certs: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            // artifacts can be arbitrarily large, only bound the idle gaps
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::base_headers(),
            proxy: None,
            use_system_proxy: true,
            danger_accept_invalid_certs: false,
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    fn base_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers
    }
}
