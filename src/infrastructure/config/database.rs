//! Persistence settings.

use serde::Deserialize;

/// Which store implementation backs the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file via Diesel.
    #[default]
    Sqlite,
    /// Process-local maps; nothing survives a restart.
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite path or `:memory:`.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_url() -> String {
    "krakenbot.db".into()
}

const fn default_pool_size() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_url(),
            pool_size: default_pool_size(),
        }
    }
}
