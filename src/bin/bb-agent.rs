//! bb-agent binary
//!
//! Burst-buffer host agent: publishes local device inventory and reconciles
//! slice assignments from the registry.

use burstbuffer_agent::logging::init_logging;
use burstbuffer_agent::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&context.config().logging)) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute(&cli.command, |line| println!("{}", line)).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
