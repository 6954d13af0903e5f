//! Session configuration

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;
use crate::protocol::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_UPSTREAM_BUFFER, DEFAULT_VIEWER_BUFFER,
};

/// Configuration for one proxied upstream source
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upstream MJPEG source
    pub upstream_url: Url,

    /// Chunks queued per viewer before it counts as stalled
    pub viewer_buffer: usize,

    /// Chunks queued between the upstream reader and the broadcast loop
    pub upstream_buffer: usize,

    /// Time allowed for the upstream response headers
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Create a config for `upstream_url` with default buffer sizes
    pub fn new(upstream_url: Url) -> Self {
        Self {
            upstream_url,
            viewer_buffer: DEFAULT_VIEWER_BUFFER,
            upstream_buffer: DEFAULT_UPSTREAM_BUFFER,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Parse and validate an upstream URL given at startup
    pub fn parse(upstream_url: Option<&str>) -> Result<Self, ConfigError> {
        let raw = upstream_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingUpstreamUrl)?;

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUpstreamUrl(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::new(url)),
            other => Err(ConfigError::InvalidUpstreamUrl(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }

    /// Set the per-viewer queue length
    pub fn viewer_buffer(mut self, chunks: usize) -> Self {
        self.viewer_buffer = chunks.max(1);
        self
    }

    /// Set the upstream queue length
    pub fn upstream_buffer(mut self, chunks: usize) -> Self {
        self.upstream_buffer = chunks.max(1);
        self
    }

    /// Set the upstream header timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
