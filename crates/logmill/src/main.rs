//! logmill CLI - rotating, retention-managed log files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    output::set_json_mode(cli.json);

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout belongs to command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("logmill={0},logmill_writer={0}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    let result = match cli.command {
        Commands::Pipe(args) => pipe::execute(args).await,
        Commands::Rotate(args) => rotate::execute(&args),
        Commands::Prune(args) => prune::execute(&args),
        Commands::List(args) => list::execute(&args),
        Commands::Next(args) => next::execute(&args),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    // A pending stdin read would otherwise keep the runtime alive after a signal
    std::process::exit(0);
}
