//! Infrastructure configuration modules.

pub mod analysis;
pub mod database;
pub mod kraken;
pub mod logging;
pub mod risk;
pub mod schedule;
pub mod settings;
pub mod trading;
