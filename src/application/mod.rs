//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the bot's use cases.
//!
//! - [`analysis`] - Technical indicators and signal generation
//! - [`order`] - Bracket orders, order monitoring and position exits
//! - [`portfolio`] - Balances, performance metrics and risk limits
//! - [`bot`] - The trading cycle tying the services together

pub mod analysis;
pub mod bot;
pub mod order;
pub mod portfolio;
