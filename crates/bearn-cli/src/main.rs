// crates/bearn-cli/src/main.rs
//
// CLI entrypoint for the Bearn incentive engine.
//
// Loads a deployment (and optionally a scenario) from TOML, initializes
// tracing at the configured level, and dispatches to a subcommand.

mod commands;
mod config;
mod output;
mod scenario;

use clap::{Parser, Subcommand};
use commands::params::ParamsCmd;
use commands::simulate::SimulateCmd;
use config::DeploymentConfig;
use scenario::Scenario;

/// Bearn CLI: replay BFI token and reward-ledger scenarios on an in-process chain.
#[derive(Parser, Debug)]
#[command(
    name = "bearn",
    version = "0.1.0",
    about = "Bearn incentive engine: capped BFI reward token and multi-pool reward ledger"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy a fresh chain and replay a scenario file.
    Simulate(SimulateCmd),

    /// Show resolved deployment parameters.
    Params(ParamsCmd),
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Simulate(cmd) => {
            let scenario = Scenario::load(&cmd.scenario)?;
            init_tracing(&scenario.deployment.log_level);
            tracing::info!(
                "Loaded scenario from {} ({} steps)",
                cmd.scenario,
                scenario.steps.len()
            );
            commands::simulate::run(cmd, &scenario)?;
        }
        Commands::Params(cmd) => {
            let config = match &cmd.config {
                Some(path) => DeploymentConfig::load(path)?,
                None => DeploymentConfig::default(),
            };
            init_tracing(&config.log_level);
            commands::params::run(cmd, &config)?;
        }
    }

    Ok(())
}
