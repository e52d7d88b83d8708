//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client runs against a local API with
//! zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use murmur_shared::constants::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::scroll::ScrollConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the API.
    /// Env: `MURMUR_API_URL`
    /// Default: `http://localhost:8000`
    pub api_url: String,

    /// Scroll trigger tuning.
    /// Env: `MURMUR_DEBOUNCE_MS`, `MURMUR_SCROLL_THRESHOLD_PX`
    /// Default: 150 ms, 300 px
    pub scroll: ScrollConfig,

    /// Per-request timeout.
    /// Env: `MURMUR_REQUEST_TIMEOUT_SECS`
    /// Default: 10 s
    pub request_timeout: Duration,

    /// Where the credential is persisted.
    /// Env: `MURMUR_SESSION_PATH`
    /// Default: `None` (the platform data directory).
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            scroll: ScrollConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    /// Unparseable values are logged and replaced by their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("MURMUR_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.api_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid MURMUR_API_URL, using default");
            }
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "MURMUR_DEBOUNCE_MS") {
            config.scroll.debounce = Duration::from_millis(ms);
        }

        if let Some(px) = parse_var::<f64>(&lookup, "MURMUR_SCROLL_THRESHOLD_PX") {
            if px.is_finite() && px >= 0.0 {
                config.scroll.threshold = px;
            } else {
                tracing::warn!(value = px, "MURMUR_SCROLL_THRESHOLD_PX must be >= 0, using default");
            }
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "MURMUR_REQUEST_TIMEOUT_SECS") {
            if secs == 0 {
                tracing::warn!("MURMUR_REQUEST_TIMEOUT_SECS must be positive, using default");
            } else {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(path) = lookup("MURMUR_SESSION_PATH") {
            if !path.trim().is_empty() {
                config.session_path = Some(PathBuf::from(path));
            }
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}
