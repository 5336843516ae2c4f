//! Handler for `check config`.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::config::database::StoreBackend;
use crate::infrastructure::config::settings::Config;

/// Load and validate the configuration, then summarize the effective values.
///
/// A missing file is not an error: the defaults are validated instead.
pub fn config(path: &Path) -> Result<()> {
    let exists = path.exists();
    let config = match Config::load_or_default(path) {
        Ok(config) => config,
        Err(e) => {
            if output::is_json() {
                output::json_output(json!({
                    "command": "check_config",
                    "path": path.display().to_string(),
                    "valid": false,
                    "error": e.to_string(),
                }));
            }
            return Err(e);
        }
    };

    if output::is_json() {
        output::json_output(json!({
            "command": "check_config",
            "path": path.display().to_string(),
            "exists": exists,
            "valid": true,
            "credentials": config.kraken.has_credentials(),
            "dry_run": config.trading.dry_run,
            "pairs": config.trading.target_pairs,
        }));
        return Ok(());
    }

    output::section("Configuration");
    output::field("Path", path.display());
    if !exists {
        output::warning("Config file not found; using defaults");
    }
    output::field("API", &config.kraken.api_url);
    output::field("Pairs", config.trading.target_pairs.join(", "));
    output::field("Interval", format!("{}m", config.trading.ohlc_interval));
    output::field("Store", store_label(&config));
    output::field("Min confidence", config.analysis.min_confidence);
    output::field("Max exposure", format!("{}%", config.risk.max_exposure_pct));
    output::field(
        "Trailing stop",
        config
            .risk
            .trailing_stop_pct
            .map_or_else(|| "off".to_string(), |pct| format!("{pct}%")),
    );

    if config.trading.dry_run {
        output::note("Dry run: orders will be simulated");
    }
    if config.kraken.has_credentials() {
        output::success("Kraken credentials found");
    } else {
        output::warning("Kraken credentials not set");
        output::hint("export KRAKEN_API_KEY and KRAKEN_PRIVATE_KEY, or use --dry-run");
    }
    output::success("Configuration is valid");
    Ok(())
}

fn store_label(config: &Config) -> String {
    match config.database.backend {
        StoreBackend::Sqlite => format!("sqlite ({})", config.database.url),
        StoreBackend::Memory => "memory".into(),
    }
}
