//! Command-line interface definitions.
//!
//! Defines the `krakenbot` command tree with `clap`. Global flags select the
//! configuration file and the output mode; subcommands either run the bot or
//! inspect and manage its stored state.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use super::paths;
use crate::domain::PositionId;

/// Technical-analysis scalping bot for Kraken spot markets
#[derive(Parser, Debug)]
#[command(name = "krakenbot")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the krakenbot CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trading loop until interrupted
    Run(RunArgs),

    /// Run a single trading cycle and exit
    Cycle(RunArgs),

    /// Show bot, portfolio and signal status
    Status,

    /// Evaluate portfolio risk limits
    Risk,

    /// Manage tracked crypto pairs
    #[command(subcommand)]
    Pairs(PairsCommand),

    /// Inspect and manage positions
    #[command(subcommand)]
    Positions(PositionsCommand),

    /// Inspect and cancel orders
    #[command(subcommand)]
    Orders(OrdersCommand),

    /// Query live market data
    #[command(subcommand)]
    Market(MarketCommand),

    /// Enable or disable new trades
    #[command(subcommand)]
    Trading(TradingCommand),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Arguments for `krakenbot run` and `krakenbot cycle`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Simulate order placement instead of trading live
    #[arg(long)]
    pub dry_run: bool,
}

/// Subcommands for `krakenbot pairs`.
#[derive(Subcommand, Debug)]
pub enum PairsCommand {
    /// Fetch configured pairs from Kraken and store them
    Sync,
    /// List stored active pairs
    List,
}

/// Subcommands for `krakenbot positions`.
#[derive(Subcommand, Debug)]
pub enum PositionsCommand {
    /// List positions
    List {
        /// Include closed positions
        #[arg(long)]
        all: bool,
    },
    /// Close an open position at market
    Close {
        /// Position id
        id: PositionId,
        /// Reason recorded on the position
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// Move the stop-loss of an open position
    Stop {
        /// Position id
        id: PositionId,
        /// New stop-loss price
        price: Decimal,
    },
}

/// Subcommands for `krakenbot orders`.
#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
    /// List orders still working on the exchange
    Open,
    /// Cancel every open order
    CancelAll,
    /// List filled, cancelled and expired orders on the exchange
    Closed,
}

/// Subcommands for `krakenbot market`.
#[derive(Subcommand, Debug)]
pub enum MarketCommand {
    /// Show the order book for a pair
    Book {
        /// Pair symbol, e.g. BTCUSD
        pair: String,
        /// Levels per side
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// Show recent public trades for a pair
    Trades {
        /// Pair symbol, e.g. BTCUSD
        pair: String,
        /// Most recent trades to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Subcommands for `krakenbot trading`.
#[derive(Subcommand, Debug)]
pub enum TradingCommand {
    /// Allow the bot to open new positions
    Enable,
    /// Stop the bot from opening new positions
    Disable,
}

/// Subcommands for `krakenbot check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal_macros::dec;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["krakenbot", "status", "--json", "--config", "bot.toml"]);
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("bot.toml"));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn config_defaults_to_home() {
        let cli = Cli::parse_from(["krakenbot", "risk"]);
        assert_eq!(cli.config, paths::default_config());
        assert!(!cli.json);
    }

    #[test]
    fn run_accepts_dry_run() {
        let cli = Cli::parse_from(["krakenbot", "run", "--dry-run"]);
        assert!(matches!(cli.command, Commands::Run(RunArgs { dry_run: true })));
    }

    #[test]
    fn positions_stop_parses_id_and_price() {
        let id = PositionId::new();
        let cli = Cli::parse_from(["krakenbot", "positions", "stop", &id.to_string(), "101.5"]);
        match cli.command {
            Commands::Positions(PositionsCommand::Stop { id: parsed, price }) => {
                assert_eq!(parsed, id);
                assert_eq!(price, dec!(101.5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn positions_close_defaults_reason() {
        let id = PositionId::new();
        let cli = Cli::parse_from(["krakenbot", "positions", "close", &id.to_string()]);
        assert!(matches!(
            cli.command,
            Commands::Positions(PositionsCommand::Close { ref reason, .. }) if reason == "manual"
        ));
    }

    #[test]
    fn rejects_malformed_position_id() {
        assert!(Cli::try_parse_from(["krakenbot", "positions", "close", "nope"]).is_err());
    }

    #[test]
    fn market_book_count_defaults_to_ten() {
        let cli = Cli::parse_from(["krakenbot", "market", "book", "BTCUSD"]);
        assert!(matches!(
            cli.command,
            Commands::Market(MarketCommand::Book { count: 10, ref pair }) if pair == "BTCUSD"
        ));
    }

    #[test]
    fn orders_cancel_all_is_kebab_case() {
        let cli = Cli::parse_from(["krakenbot", "orders", "cancel-all"]);
        assert!(matches!(cli.command, Commands::Orders(OrdersCommand::CancelAll)));
    }

    #[test]
    fn market_trades_limit_defaults_to_twenty() {
        let cli = Cli::parse_from(["krakenbot", "market", "trades", "ETHUSD"]);
        assert!(matches!(
            cli.command,
            Commands::Market(MarketCommand::Trades { limit: 20, ref pair }) if pair == "ETHUSD"
        ));
    }
}
