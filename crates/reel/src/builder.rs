//! Chained construction of [`DownloaderConfig`] from command-line style
//! settings.
//!
//! ```
//! use std::time::Duration;
//! use reel_engine::DownloaderConfig;
//!
//! let config = DownloaderConfig::builder()
//!     .timeouts(Duration::ZERO, Duration::from_secs(5), Duration::from_secs(20))
//!     .direct()
//!     .build();
//! assert!(config.proxy.is_none());
//! assert!(!config.use_system_proxy);
//! ```

use std::time::Duration;

use crate::{DownloaderConfig, proxy::ProxyConfig};

#[derive(Debug, Clone, Default)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall, connect and read timeouts. A zero leaves that bound off.
    pub fn timeouts(mut self, overall: Duration, connect: Duration, read: Duration) -> Self {
        self.config.timeout = overall;
        self.config.connect_timeout = connect;
        self.config.read_timeout = read;
        self
    }

    /// Route every request through `proxy`, ignoring system settings.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false;
        self
    }

    /// Connect directly, without an explicit or system proxy.
    pub fn direct(mut self) -> Self {
        self.config.proxy = None;
        self.config.use_system_proxy = false;
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}
