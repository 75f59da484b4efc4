//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("nutrilabel-client/", env!("CARGO_PKG_VERSION"));

/// Settings for building a [`NutriClient`](crate::client::NutriClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://api.example.com`
    pub base_url: Option<String>,
    pub user_agent: String,
    /// Per-request timeout in seconds (native targets only)
    pub timeout_secs: Option<u64>,
    /// Upper bound for the token refresh call in seconds; unset waits indefinitely
    pub refresh_timeout_secs: Option<u64>,
    /// Directory holding the durable token file; unset uses the platform data dir
    pub token_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            refresh_timeout_secs: None,
            token_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.refresh_timeout_secs.map(Duration::from_secs)
    }
}
