//! CLI module graph and command dispatch.

pub mod check;
pub mod command;
pub mod market;
pub mod orders;
pub mod output;
pub mod pairs;
pub mod paths;
pub mod positions;
pub mod run;
pub mod status;

use std::path::Path;

use crate::adapter::inbound::cli::command::{
    CheckCommand, Cli, Commands, MarketCommand, OrdersCommand, PairsCommand, PositionsCommand,
    TradingCommand,
};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Load configuration, apply the `--dry-run` override and start logging.
pub fn load_config(path: &Path, dry_run: bool) -> Result<Config> {
    let mut config = Config::load_or_default(path)?;
    if dry_run {
        config.trading.dry_run = true;
    }
    config.init_logging();
    Ok(config)
}

/// Run the parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    let path = cli.config.as_path();
    match cli.command {
        Commands::Check(CheckCommand::Config) => check::config(path),
        Commands::Run(args) => run::execute(load_config(path, args.dry_run)?).await,
        Commands::Cycle(args) => run::cycle(load_config(path, args.dry_run)?).await,
        Commands::Status => status::execute(load_config(path, false)?).await,
        Commands::Risk => status::risk(load_config(path, false)?).await,
        Commands::Trading(TradingCommand::Enable) => {
            status::set_trading(load_config(path, false)?, true).await
        }
        Commands::Trading(TradingCommand::Disable) => {
            status::set_trading(load_config(path, false)?, false).await
        }
        Commands::Pairs(PairsCommand::Sync) => pairs::sync(load_config(path, false)?).await,
        Commands::Pairs(PairsCommand::List) => pairs::list(load_config(path, false)?).await,
        Commands::Positions(PositionsCommand::List { all }) => {
            positions::list(load_config(path, false)?, all).await
        }
        Commands::Positions(PositionsCommand::Close { id, reason }) => {
            positions::close(load_config(path, false)?, id, &reason).await
        }
        Commands::Positions(PositionsCommand::Stop { id, price }) => {
            positions::stop(load_config(path, false)?, id, price).await
        }
        Commands::Orders(OrdersCommand::Open) => orders::open(load_config(path, false)?).await,
        Commands::Orders(OrdersCommand::Closed) => orders::closed(load_config(path, false)?).await,
        Commands::Orders(OrdersCommand::CancelAll) => {
            orders::cancel_all(load_config(path, false)?).await
        }
        Commands::Market(MarketCommand::Book { pair, count }) => {
            market::book(load_config(path, false)?, &pair, count).await
        }
        Commands::Market(MarketCommand::Trades { pair, limit }) => {
            market::trades(load_config(path, false)?, &pair, limit).await
        }
    }
}
