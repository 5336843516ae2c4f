//! Krakenbot - technical-analysis scalping bot for Kraken spot markets.
//!
//! The bot pulls one-minute candles for a configured set of pairs, computes
//! RSI, MACD, moving averages and Bollinger bands, and turns indicator votes
//! into BUY/SELL signals. Confident signals become bracket orders: a limit
//! entry followed by stop-loss and take-profit orders once the entry fills.
//! Positions are marked to market every cycle, stops may trail the price,
//! and portfolio metrics and risk limits gate new trades.
//!
//! # Architecture
//!
//! - [`domain`] - Exchange-agnostic types: pairs, candles, signals, orders,
//!   positions, portfolio
//! - [`port`] - `Exchange` and `TradingStore` traits
//! - [`application`] - Analysis, order management, portfolio and the bot
//! - [`adapter`] - Kraken REST client, paper exchange, SQLite and memory
//!   stores, and the CLI
//! - [`infrastructure`] - Configuration and composition
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Test doubles and builders for integration tests
//!
//! # Example
//!
//! ```no_run
//! use krakenbot::infrastructure::bootstrap;
//! use krakenbot::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> krakenbot::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let bot = bootstrap::build_bot(&config)?;
//! let report = bot.run_cycle().await;
//! println!("{} signal(s)", report.signals_generated);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
