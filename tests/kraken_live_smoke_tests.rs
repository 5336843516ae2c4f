//! Read-only checks against Kraken's public endpoints.
//!
//! Run with: `KRAKENBOT_SMOKE=1 cargo test --features integration-tests -- --ignored`
#![cfg(feature = "integration-tests")]

use std::env;
use std::time::Duration;

use krakenbot::adapter::outbound::kraken::KrakenClient;
use krakenbot::infrastructure::config::kraken::KrakenConfig;
use krakenbot::port::outbound::exchange::Exchange;
use tokio::time::timeout;

fn smoke_enabled() -> bool {
    matches!(env::var("KRAKENBOT_SMOKE").ok().as_deref(), Some("1"))
}

#[tokio::test]
#[ignore = "requires KRAKENBOT_SMOKE=1 and network access"]
async fn smoke_kraken_asset_pairs_readonly() {
    if !smoke_enabled() {
        eprintln!("Skipping smoke test (set KRAKENBOT_SMOKE=1 to enable)");
        return;
    }

    let client = KrakenClient::from_config(&KrakenConfig::default());
    let pairs = timeout(Duration::from_secs(20), client.asset_pairs())
        .await
        .expect("Timed out querying AssetPairs")
        .expect("Failed to fetch asset pairs");

    assert!(
        pairs.values().any(|p| p.altname == "XBTUSD"),
        "Expected XBTUSD among {} pairs",
        pairs.len()
    );
}

#[tokio::test]
#[ignore = "requires KRAKENBOT_SMOKE=1 and network access"]
async fn smoke_kraken_order_book_readonly() {
    if !smoke_enabled() {
        eprintln!("Skipping smoke test (set KRAKENBOT_SMOKE=1 to enable)");
        return;
    }

    let client = KrakenClient::from_config(&KrakenConfig::default());
    let book = timeout(Duration::from_secs(20), client.order_book("XBTUSD", 5))
        .await
        .expect("Timed out querying Depth")
        .expect("Failed to fetch order book");

    assert!(!book.bids.is_empty());
    assert!(!book.asks.is_empty());
    assert!(book.bids[0].price < book.asks[0].price);
}
