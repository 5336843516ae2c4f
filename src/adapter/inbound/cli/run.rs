//! Handlers for `run` and `cycle`.

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::adapter::inbound::cli::output;
use crate::application::bot::CycleReport;
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Run the trading loop until Ctrl+C.
pub async fn execute(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    print_startup(&config);

    info!(
        pairs = config.trading.target_pairs.len(),
        dry_run = config.trading.dry_run,
        "krakenbot starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handle = tokio::spawn(async move { bot.run(shutdown_rx).await });

    tokio::select! {
        result = &mut handle => {
            join(result)?;
            info!("krakenbot stopped");
            return Ok(());
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received (Ctrl+C)");
            let _ = shutdown_tx.send(true);
        }
    }

    join(handle.await)?;
    info!("krakenbot stopped");
    Ok(())
}

/// Run exactly one trading cycle and print its report.
pub async fn cycle(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    bot.portfolio().init().await?;
    bot.initialize_pairs().await?;

    let report = bot.run_cycle().await;
    print_report(&report)
}

fn join(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    result.map_err(|e| Error::Connection(format!("trading task failed: {e}")))?
}

fn print_startup(config: &Config) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Pairs", config.trading.target_pairs.join(", "));
    output::field(
        "Interval",
        format!("{}m candles, {}s tick", config.trading.ohlc_interval, config.schedule.tick_secs),
    );
    output::field("Database", &config.database.url);
    if config.trading.dry_run {
        output::warning(&format!(
            "Dry-run mode enabled - orders are simulated against {} {}",
            config.trading.paper_balance, config.trading.quote_asset
        ));
    }
}

fn print_report(report: &CycleReport) -> Result<()> {
    if output::is_json() {
        output::json_output(serde_json::to_value(report)?);
        return Ok(());
    }

    output::section("Cycle");
    output::field("Market data", yes_no(report.market_data_updated));
    output::field("Signals", report.signals_generated);
    output::field("Positions opened", report.positions_created);
    output::field("Monitored", report.positions_monitored);
    output::field("Portfolio", yes_no(report.portfolio_updated));

    if report.errors.is_empty() {
        output::success("Cycle completed");
    } else {
        for error in &report.errors {
            output::warning(error);
        }
    }
    Ok(())
}

const fn yes_no(value: bool) -> &'static str {
    if value {
        "updated"
    } else {
        "skipped"
    }
}
