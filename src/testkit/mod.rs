//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`exchange`]: `ScriptedExchange`, an in-memory exchange with scripted
//!   prices and manual order fills.
//! - [`domain`]: Builders for pairs, candles and signals.
//! - [`config`]: Canonical test configurations.

pub mod config;
pub mod domain;
pub mod exchange;
