// crates/bearn-cli/src/commands/params.rs
//
// `bearn params`: show the deployment parameters a configuration resolves to.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use bearn_economics::Deployment;

use crate::config::DeploymentConfig;
use crate::output::{decimal, format_json, format_table, OutputFormat};

/// Arguments for `bearn params`.
#[derive(Debug, Args)]
pub struct ParamsCmd {
    /// Deployment TOML file. Launch defaults are used when omitted.
    #[arg(long)]
    pub config: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Tabled, Serialize)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(name: &str, value: impl ToString) -> ParamRow {
    ParamRow {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn rows(deployment: &Deployment) -> Vec<ParamRow> {
    let split = deployment.token.fund_split;
    let funds = deployment.token.funds;
    vec![
        row("governance", deployment.deployer),
        row("reward token", deployment.token_address),
        row("reward ledger", deployment.ledger_address),
        row("cap (BFI)", decimal(deployment.token.cap)),
        row("game fund (BFI)", decimal(deployment.token.game_fund_amount)),
        row("public fund (bps)", split.public_bps),
        row("community fund (bps)", split.community_bps),
        row("team fund (bps)", split.team_bps),
        row("public fund", funds.public),
        row("community fund", funds.community),
        row("team fund", funds.team),
        row("game fund", funds.game),
        row("emission per block (BFI)", decimal(deployment.emission_rate)),
        row("start height", deployment.start_height),
        row("block time (s)", deployment.block_time_secs),
        row("automine", deployment.automine),
    ]
}

/// Run the params command.
pub fn run(cmd: &ParamsCmd, config: &DeploymentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let deployment = config.to_deployment()?;
    let rows = rows(&deployment);
    match OutputFormat::from_json_flag(cmd.json) {
        OutputFormat::Json => println!("{}", format_json(&rows)),
        OutputFormat::Table => println!("{}", format_table(&rows)),
    }
    Ok(())
}
