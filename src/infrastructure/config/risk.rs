//! Risk management configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Portfolio-wide risk limits.
///
/// Per-position size and daily loss limits live on the stored portfolio so
/// they can be changed at runtime; these are the static ones.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum total exposure as a percent of the portfolio balance.
    #[serde(default = "default_max_exposure_pct")]
    pub max_exposure_pct: Decimal,
    /// Trailing stop distance as a percent of the entry price.
    /// Trailing stops are off when unset.
    #[serde(default)]
    pub trailing_stop_pct: Option<Decimal>,
}

fn default_max_exposure_pct() -> Decimal {
    dec!(50)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_exposure_pct: default_max_exposure_pct(),
            trailing_stop_pct: None,
        }
    }
}
