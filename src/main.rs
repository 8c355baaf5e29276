//! chesswatch: tells a Telegram chat when chess.com players come online.

use std::path::PathBuf;

use chesswatch::config::WatchConfig;
use chesswatch::daemon;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

/// Watch chess.com players and ping Telegram when they come online.
#[derive(Parser)]
#[command(name = "chesswatch", version, about)]
struct Cli {
    /// Path to the config file (missing file = defaults + environment).
    #[arg(short, long, global = true, default_value = "chesswatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor and command listener until interrupted (default).
    Run,

    /// Look every player up once and print their status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WatchConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => daemon::start(config).await,
        Command::Status => daemon::print_status(&config).await,
    }
}
