// crates/bearn-cli/src/commands/simulate.rs
//
// `bearn simulate`: deploy a fresh chain, replay a scenario, and report the
// step outcomes, the pool registry, and every principal's BFI balance.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use bearn_core::traits::FungibleToken;

use crate::output::{decimal, format_json, format_table, OutputFormat};
use crate::scenario::{Runner, Scenario, StepRecord};

/// Arguments for `bearn simulate`.
#[derive(Debug, Args)]
pub struct SimulateCmd {
    /// Scenario TOML file.
    #[arg(long)]
    pub scenario: String,

    /// Stop at the first reverted step and exit with an error.
    #[arg(long)]
    pub fail_fast: bool,

    /// Print JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Height")]
    height: u64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Caller")]
    caller: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&StepRecord> for StepRow {
    fn from(record: &StepRecord) -> Self {
        let result = match &record.error {
            Some(e) => format!("reverted: {}", e),
            None if record.detail.is_empty() => "ok".to_string(),
            None => record.detail.clone(),
        };
        Self {
            index: record.index,
            height: record.height,
            action: record.action.clone(),
            caller: record.caller.clone(),
            result,
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct PoolRow {
    #[tabled(rename = "Pool")]
    id: usize,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Weight")]
    weight: u64,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Last Accrual")]
    last_accrual_height: u64,
    #[tabled(rename = "Acc/Share")]
    acc_reward_per_share: String,
    #[tabled(rename = "Staked")]
    total_staked: String,
}

#[derive(Debug, Tabled, Serialize)]
struct BalanceRow {
    #[tabled(rename = "Principal")]
    principal: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "BFI")]
    bfi: String,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    height: u64,
    timestamp: u64,
    total_supply: String,
    cap: String,
    total_alloc_weight: u64,
    steps: Vec<StepRecord>,
    pools: Vec<PoolRow>,
    balances: Vec<BalanceRow>,
}

fn build_report(runner: &Runner, steps: Vec<StepRecord>) -> SimulationReport {
    let chain = runner.chain();
    let token = chain.reward_token();
    let ledger = chain.ledger();

    let pools = ledger
        .pools()
        .iter()
        .enumerate()
        .map(|(id, pool)| PoolRow {
            id,
            token: chain
                .state()
                .deposit_tokens
                .get(&pool.deposit_token)
                .map(|t| t.symbol().to_string())
                .unwrap_or_else(|| pool.deposit_token.short()),
            weight: pool.alloc_weight,
            phase: format!("{:?}", pool.phase()),
            last_accrual_height: pool.last_accrual_height,
            acc_reward_per_share: pool.acc_reward_per_share.to_string(),
            total_staked: decimal(pool.total_staked),
        })
        .collect();

    let mut balances: Vec<BalanceRow> = runner
        .principals()
        .iter()
        .map(|(name, address)| BalanceRow {
            principal: name.clone(),
            address: address.short(),
            bfi: decimal(token.balance_of(address)),
        })
        .collect();
    balances.push(BalanceRow {
        principal: "ledger".to_string(),
        address: ledger.address().short(),
        bfi: decimal(token.balance_of(&ledger.address())),
    });

    SimulationReport {
        height: chain.height(),
        timestamp: chain.timestamp(),
        total_supply: decimal(token.total_supply()),
        cap: decimal(token.cap()),
        total_alloc_weight: ledger.total_alloc_weight(),
        steps,
        pools,
        balances,
    }
}

/// Run the simulate command.
pub fn run(cmd: &SimulateCmd, scenario: &Scenario) -> Result<(), Box<dyn std::error::Error>> {
    let mut runner = Runner::new(&scenario.deployment, cmd.fail_fast)?;
    let records = runner.run(&scenario.steps)?;
    let reverted = records.iter().filter(|r| r.error.is_some()).count();
    let report = build_report(&runner, records);

    match OutputFormat::from_json_flag(cmd.json) {
        OutputFormat::Json => println!("{}", format_json(&report)),
        OutputFormat::Table => {
            let steps: Vec<StepRow> = report.steps.iter().map(StepRow::from).collect();
            println!("Steps ({} reverted)", reverted);
            println!("{}", format_table(&steps));
            println!();
            println!("Pools (total weight {})", report.total_alloc_weight);
            println!("{}", format_table(&report.pools));
            println!();
            println!("Balances");
            println!("{}", format_table(&report.balances));
            println!();
            println!(
                "Height {}  |  Supply {} / {} BFI",
                report.height, report.total_supply, report.cap
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_pools_and_custody() {
        let scenario = Scenario::parse(
            r#"
            [[steps]]
            action = "create_token"
            from = "deployer"
            name = "BUSD"
            symbol = "BUSD"

            [[steps]]
            action = "add_pool"
            from = "deployer"
            token = "BUSD"
            weight = 500

            [[steps]]
            action = "mint"
            from = "deployer"
            to = "ledger"
            amount = "1000"
            "#,
        )
        .unwrap();
        let mut runner = Runner::new(&scenario.deployment, true).unwrap();
        let records = runner.run(&scenario.steps).unwrap();
        let report = build_report(&runner, records);

        assert_eq!(report.pools.len(), 1);
        assert_eq!(report.pools[0].token, "BUSD");
        assert_eq!(report.pools[0].phase, "Pending");
        let ledger = report.balances.iter().find(|b| b.principal == "ledger").unwrap();
        assert_eq!(ledger.bfi, "1000");
        assert_eq!(report.total_supply, "1000");
    }

    #[test]
    fn test_step_row_marks_reverts() {
        let record = StepRecord {
            index: 3,
            height: 9,
            action: "burn".to_string(),
            caller: "bob".to_string(),
            error: Some("Insufficient balance".to_string()),
            detail: String::new(),
        };
        let row = StepRow::from(&record);
        assert!(row.result.starts_with("reverted:"));
    }
}
