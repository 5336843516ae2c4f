//! Outbound adapters: exchanges and persistence.

pub mod kraken;
pub mod memory;
pub mod paper;
pub mod sqlite;
