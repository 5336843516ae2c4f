//! Path utilities for krakenbot.
//!
//! The default configuration lives at `~/.krakenbot/config.toml`.

use std::path::PathBuf;

/// Returns the krakenbot home directory (`~/.krakenbot/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".krakenbot")
}

/// Returns the default config file path (`~/.krakenbot/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_under_krakenbot_home() {
        let home = home_dir();
        let config = default_config();

        assert!(home.to_string_lossy().contains(".krakenbot"));
        assert!(config.starts_with(&home));
        assert_eq!(config.file_name().unwrap(), "config.toml");
    }
}
