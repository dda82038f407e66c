//! Bakery - Batch container image builder
//!
//! CLI entry point.

use bakery::cli::Cli;
use bakery::error::BakeryResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BakeryResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = info (plan announcements), 1+ = debug/trace
    let filter = match cli.verbose {
        0 => EnvFilter::new("bakery=info"),
        1 => EnvFilter::new("bakery=debug"),
        _ => EnvFilter::new("bakery=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    bakery::cli::run(cli).await
}
