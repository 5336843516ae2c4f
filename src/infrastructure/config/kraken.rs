//! Kraken connection settings.

use serde::Deserialize;

/// Kraken REST API configuration.
///
/// Credentials are never read from the config file; they come from
/// `KRAKEN_API_KEY` and `KRAKEN_PRIVATE_KEY`.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Minimum spacing between any two requests.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub private_key: Option<String>,
}

fn default_api_url() -> String {
    "https://api.kraken.com".into()
}

fn default_api_version() -> String {
    "0".into()
}

const fn default_min_request_interval_ms() -> u64 {
    1_000
}

const fn default_timeout_ms() -> u64 {
    10_000
}

impl KrakenConfig {
    /// Fill credentials from the environment.
    pub fn load_credentials_from_env(&mut self) {
        self.api_key = std::env::var("KRAKEN_API_KEY").ok().filter(|v| !v.is_empty());
        self.private_key = std::env::var("KRAKEN_PRIVATE_KEY")
            .ok()
            .filter(|v| !v.is_empty());
    }

    /// True when both credentials are present.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.private_key.is_some()
    }
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_version: default_api_version(),
            min_request_interval_ms: default_min_request_interval_ms(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
            private_key: None,
        }
    }
}
