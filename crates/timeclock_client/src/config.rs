//! Configuration for the client.

use std::time::Duration;

/// Default backend endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Configuration for outbound requests and best-effort captures.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend endpoint every request path is appended to.
    pub base_url: String,
    /// Default request timeout.
    pub timeout: Duration,
    /// Upper bound on location capture before the action proceeds without one.
    pub location_timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            timeout: Duration::from_secs(10),
            location_timeout: Duration::from_secs(5),
            user_agent: format!("timeclock/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the location capture bound.
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Joins `path` onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
