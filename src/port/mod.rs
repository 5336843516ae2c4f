//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the trading logic and the outside world.
//! Adapters implement them to integrate with the exchange and the database.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  analysis, orders,      │
//!                    │  portfolio, bot         │
//!                    └───────────┬─────────────┘
//!                 ┌──────────────┴──────────────┐
//!                 ▼                             ▼
//!          ┌─────────────┐              ┌─────────────┐
//!          │  Exchange   │              │    Store    │
//!          │ Kraken/paper│              │sqlite/memory│
//!          └─────────────┘              └─────────────┘
//! ```

pub mod outbound;
