//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; Kraken credentials come from
//! `KRAKEN_API_KEY` and `KRAKEN_PRIVATE_KEY` and are never read from disk.
//!
//! # Example
//!
//! ```no_run
//! use krakenbot::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::analysis::AnalysisConfig;
use super::database::{DatabaseConfig, StoreBackend};
use super::kraken::KrakenConfig;
use super::logging::LoggingConfig;
use super::risk::RiskConfig;
use super::schedule::ScheduleConfig;
use super::trading::TradingConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub kraken: KrakenConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub trading: TradingConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

impl Config {
    /// Parse configuration from TOML content and load credentials from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.kraken.load_credentials_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for an existing file.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    /// Check that values are within acceptable ranges.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.kraken.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.database.backend == StoreBackend::Sqlite && self.database.url.is_empty() {
            return Err(ConfigError::MissingField { field: "url" }.into());
        }
        if self.database.pool_size == 0 {
            return Err(invalid("pool_size", "must be greater than 0"));
        }
        if self.trading.target_pairs.is_empty() {
            return Err(ConfigError::MissingField {
                field: "target_pairs",
            }
            .into());
        }
        if self.trading.ohlc_interval == 0 {
            return Err(invalid("ohlc_interval", "must be greater than 0"));
        }
        if self.trading.candles_per_update == 0 {
            return Err(invalid("candles_per_update", "must be greater than 0"));
        }
        if self.trading.min_position_usd < Decimal::ZERO {
            return Err(invalid("min_position_usd", "must be 0 or greater"));
        }
        if self.trading.paper_balance < Decimal::ZERO {
            return Err(invalid("paper_balance", "must be 0 or greater"));
        }
        if !(0.0..=1.0).contains(&self.analysis.min_confidence) {
            return Err(invalid("min_confidence", "must be between 0 and 1"));
        }
        if self.analysis.min_signal_rows < 2 {
            return Err(invalid("min_signal_rows", "must be at least 2"));
        }
        if self.analysis.signal_ttl_minutes <= 0 {
            return Err(invalid("signal_ttl_minutes", "must be greater than 0"));
        }
        if self.risk.max_exposure_pct <= Decimal::ZERO {
            return Err(invalid("max_exposure_pct", "must be greater than 0"));
        }
        if let Some(pct) = self.risk.trailing_stop_pct {
            if pct <= Decimal::ZERO || pct >= Decimal::ONE_HUNDRED {
                return Err(invalid("trailing_stop_pct", "must be between 0 and 100"));
            }
        }
        if self.schedule.tick_secs == 0 {
            return Err(invalid("tick_secs", "must be greater than 0"));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("format", "must be \"pretty\" or \"json\""));
        }
        Ok(())
    }

    /// Initialize the tracing subscriber.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.kraken.api_url, "https://api.kraken.com");
        assert_eq!(config.trading.target_pairs.len(), 10);
        assert_eq!(config.trading.min_position_usd, dec!(50));
        assert_eq!(config.schedule.signal_generation_secs, 300);
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert!(!config.trading.dry_run);
        assert!(config.risk.trailing_stop_pct.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            [database]
            backend = "memory"

            [trading]
            target_pairs = ["BTCUSD"]
            dry_run = true

            [risk]
            trailing_stop_pct = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.trading.target_pairs, vec!["BTCUSD".to_string()]);
        assert!(config.trading.dry_run);
        assert_eq!(config.risk.trailing_stop_pct, Some(dec!(1.5)));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let err = Config::parse_toml("[analysis]\nmin_confidence = 1.5").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "min_confidence",
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_pair_list() {
        let err = Config::parse_toml("[trading]\ntarget_pairs = []").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField {
                field: "target_pairs"
            })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::parse_toml("[trading\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
