//! Kraken REST API client.
//!
//! Public endpoints are plain `GET`s. Private endpoints are form-encoded
//! `POST`s signed with the account's private key. All requests share one
//! rate limiter so concurrent callers stay at least
//! `min_request_interval_ms` apart.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::form_urlencoded;

use super::auth;
use super::dto::{self, Envelope};
use crate::error::{ExchangeError, Result};
use crate::infrastructure::config::kraken::KrakenConfig;
use crate::port::outbound::exchange::{
    AssetPairInfo, Candle, Exchange, ExchangeOrder, OrderBook, OrderPlacement, OrderRequest,
    Ticker, Trade, TradeBalance,
};

/// OHLC intervals (minutes) accepted by Kraken.
pub const OHLC_INTERVALS: [u32; 9] = [1, 5, 15, 30, 60, 240, 1440, 10080, 21600];

struct Credentials {
    api_key: String,
    private_key: String,
}

/// HTTP client for the Kraken REST API.
pub struct KrakenClient {
    http: HttpClient,
    base_url: String,
    api_version: String,
    credentials: Option<Credentials>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl KrakenClient {
    #[must_use]
    pub fn from_config(config: &KrakenConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("krakenbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        let credentials = match (&config.api_key, &config.private_key) {
            (Some(api_key), Some(private_key)) => Some(Credentials {
                api_key: api_key.clone(),
                private_key: private_key.clone(),
            }),
            _ => None,
        };

        Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            credentials,
            min_interval: Duration::from_millis(config.min_request_interval_ms),
            last_request: Mutex::new(None),
        }
    }

    /// True when private endpoints can be called.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Wait until the minimum spacing since the previous request has passed.
    ///
    /// The lock is held across the sleep so waiting callers queue up.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn public(&self, endpoint: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        self.rate_limit().await;

        let url = format!("{}/{}/public/{}", self.base_url, self.api_version, endpoint);
        debug!(endpoint, "Kraken public request");

        let envelope: Envelope = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        envelope.into_result()
    }

    async fn private(&self, endpoint: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials)?;

        self.rate_limit().await;

        let path = format!("/{}/private/{}", self.api_version, endpoint);
        let nonce = auth::nonce();

        let body = {
            let mut body = form_urlencoded::Serializer::new(String::new());
            body.append_pair("nonce", &nonce);
            for (key, value) in params {
                body.append_pair(key, value);
            }
            body.finish()
        };

        let signature = auth::sign(&path, &nonce, &body, &credentials.private_key)?;
        debug!(endpoint, "Kraken private request");

        let envelope: Envelope = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("API-Key", &credentials.api_key)
            .header("API-Sign", signature)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        envelope.into_result()
    }
}

/// Form parameters for an `AddOrder` call.
fn order_params(request: &OrderRequest) -> Vec<(&str, String)> {
    let mut params = vec![
        ("pair", request.pair.clone()),
        ("type", request.side.as_str().to_string()),
        ("ordertype", request.order_type.as_str().to_string()),
        ("volume", request.volume.normalize().to_string()),
    ];
    if let Some(price) = request.price {
        params.push(("price", price.normalize().to_string()));
    }
    if let Some(price2) = request.price2 {
        params.push(("price2", price2.normalize().to_string()));
    }
    params.extend(
        request
            .extra
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone())),
    );
    params
}

#[async_trait]
impl Exchange for KrakenClient {
    async fn asset_pairs(&self) -> Result<HashMap<String, AssetPairInfo>> {
        let pairs = dto::asset_pairs(self.public("AssetPairs", &[]).await?)?;
        debug!(count = pairs.len(), "Fetched asset pairs");
        Ok(pairs)
    }

    async fn ticker(&self, pairs: &[String]) -> Result<HashMap<String, Ticker>> {
        let mut params = Vec::new();
        if !pairs.is_empty() {
            params.push(("pair", pairs.join(",")));
        }
        dto::ticker(self.public("Ticker", &params).await?, pairs)
    }

    async fn ohlc(&self, pair: &str, interval: u32, since: Option<i64>) -> Result<Vec<Candle>> {
        if !OHLC_INTERVALS.contains(&interval) {
            warn!(interval, "OHLC interval not supported by Kraken");
        }
        let mut params = vec![("pair", pair.to_string()), ("interval", interval.to_string())];
        if let Some(since) = since {
            params.push(("since", since.to_string()));
        }
        dto::ohlc(self.public("OHLC", &params).await?, pair)
    }

    async fn recent_trades(&self, pair: &str, since: Option<i64>) -> Result<Vec<Trade>> {
        let mut params = vec![("pair", pair.to_string())];
        if let Some(since) = since {
            params.push(("since", since.to_string()));
        }
        dto::trades(self.public("Trades", &params).await?, pair)
    }

    async fn order_book(&self, pair: &str, count: u32) -> Result<OrderBook> {
        let params = [("pair", pair.to_string()), ("count", count.to_string())];
        dto::order_book(self.public("Depth", &params).await?, pair)
    }

    async fn balance(&self) -> Result<HashMap<String, Decimal>> {
        dto::balance(self.private("Balance", &[]).await?)
    }

    async fn trade_balance(&self, asset: &str) -> Result<TradeBalance> {
        let params = [("asset", asset.to_string())];
        dto::trade_balance(self.private("TradeBalance", &params).await?)
    }

    async fn open_orders(&self) -> Result<Vec<ExchangeOrder>> {
        dto::open_orders(self.private("OpenOrders", &[]).await?)
    }

    async fn closed_orders(&self) -> Result<Vec<ExchangeOrder>> {
        dto::closed_orders(self.private("ClosedOrders", &[]).await?)
    }

    async fn add_order(&self, request: &OrderRequest) -> Result<OrderPlacement> {
        let placement = dto::add_order(self.private("AddOrder", &order_params(request)).await?)?;
        info!(
            pair = %request.pair,
            side = %request.side,
            order_type = %request.order_type,
            volume = %request.volume,
            txid = ?placement.txid(),
            "Order submitted"
        );
        Ok(placement)
    }

    async fn cancel_order(&self, txid: &str) -> Result<()> {
        let params = [("txid", txid.to_string())];
        let count = dto::count("CancelOrder", self.private("CancelOrder", &params).await?)?;
        info!(txid, count, "Order cancelled");
        Ok(())
    }

    async fn cancel_all(&self) -> Result<u32> {
        let count = dto::count("CancelAll", self.private("CancelAll", &[]).await?)?;
        info!(count, "Cancelled all open orders");
        Ok(count)
    }

    async fn query_orders(&self, txids: &[String]) -> Result<HashMap<String, ExchangeOrder>> {
        if txids.is_empty() {
            return Ok(HashMap::new());
        }
        let params = [("txid", txids.join(","))];
        dto::query_orders(self.private("QueryOrders", &params).await?)
    }

    fn exchange_name(&self) -> &'static str {
        "Kraken"
    }
}
