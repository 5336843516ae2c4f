use clap::Parser;
use krakenbot::adapter::inbound::cli::command::Cli;
use krakenbot::adapter::inbound::cli::output::{self, OutputConfig};
use krakenbot::adapter::inbound::cli::execute;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    if let Err(e) = execute(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
