use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Commands;

const DEBUG_FILTER: &str = "error,relay=debug,relay_dispatch=debug,relay_mentions=debug";

#[derive(Parser, PartialEq, Debug)]
#[command(name = "relay")]
#[command(about = "Find out who a chat message mentions and notify them", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(long = "debug", default_value_t = false, global = true)]
    debug: bool,

    /// Config file to use instead of ~/.relay/relay.toml
    #[arg(long = "config", env = "RELAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { DEBUG_FILTER } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.run(cli.config.as_deref()).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            eprintln!("Ops! something went wrong: {}", e);
            std::process::exit(1);
        }
    }
}
