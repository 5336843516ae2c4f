//! Tradable crypto pairs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::PairId;
use super::money::Volume;

/// A spot pair tradable on the exchange, e.g. `BTCUSD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoPair {
    pub id: PairId,
    /// Exchange symbol, e.g. `BTCUSD`.
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Human readable name, `BASE/QUOTE`.
    pub display_name: String,
    pub is_active: bool,
    pub min_order_size: Volume,
    pub price_precision: u32,
    pub volume_precision: u32,
    /// Raw pair description returned by the exchange.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl CryptoPair {
    /// Create an active pair with a fresh id.
    pub fn new(
        symbol: impl Into<String>,
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        min_order_size: Volume,
        price_precision: u32,
        volume_precision: u32,
    ) -> Self {
        let base_asset = base_asset.into();
        let quote_asset = quote_asset.into();
        let now = Utc::now();
        Self {
            id: PairId::new(),
            symbol: symbol.into(),
            display_name: format!("{base_asset}/{quote_asset}"),
            base_asset,
            quote_asset,
            is_active: true,
            min_order_size,
            price_precision,
            volume_precision,
            metadata: serde_json::Value::Null,
            created_at: now,
            last_updated: now,
        }
    }

    /// Attach the exchange's raw description.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Round a base-currency amount to the pair's lot precision.
    #[must_use]
    pub fn round_volume(&self, amount: Decimal) -> Decimal {
        amount.round_dp(self.volume_precision)
    }

    /// Round a price to the pair's price precision.
    #[must_use]
    pub fn round_price(&self, price: Decimal) -> Decimal {
        price.round_dp(self.price_precision)
    }
}
