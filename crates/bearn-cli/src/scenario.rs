// crates/bearn-cli/src/scenario.rs
//
// Scenario files: a deployment plus an ordered list of steps replayed on a
// fresh chain.
//
// Principals and tokens are named by label. "ledger" names the reward
// ledger's custody address, "BFI" the reward token; other tokens are named by
// the symbol they were created with. A step that reverts is recorded and
// the replay continues, unless fail-fast is requested.

use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bearn_core::error::BearnError;
use bearn_core::identity::Address;
use bearn_core::traits::FungibleToken;
use bearn_economics::erc20::UNLIMITED_ALLOWANCE;
use bearn_economics::{Bfi, Chain};

use crate::config::{resolve_principal, DeploymentConfig};
use crate::output::decimal_units;

/// Errors raised while loading or replaying a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Deployment failed: {0}")]
    Deployment(BearnError),

    #[error("Step {index} ({action}) reverted: {source}")]
    Reverted {
        index: usize,
        action: String,
        source: BearnError,
    },
}

fn default_decimals() -> u8 {
    18
}

fn default_spender() -> String {
    "ledger".to_string()
}

/// One scripted call or clock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Mint { from: String, to: String, amount: String },
    Burn { from: String, amount: String },
    AddMinter { from: String, minter: String },
    RemoveMinter { from: String, minter: String },
    MintFunds { from: String, amount: String },
    MintGameFund { from: String },
    CreateToken {
        from: String,
        name: String,
        symbol: String,
        #[serde(default = "default_decimals")]
        decimals: u8,
    },
    Faucet { to: String, token: String, amount: String },
    /// Omitting `amount` grants an unlimited allowance.
    Approve {
        from: String,
        token: String,
        #[serde(default = "default_spender")]
        spender: String,
        #[serde(default)]
        amount: Option<String>,
    },
    Transfer { from: String, token: String, to: String, amount: String },
    AddPool {
        from: String,
        token: String,
        weight: u64,
        #[serde(default)]
        with_update: bool,
        #[serde(default)]
        last_accrual_height: Option<u64>,
    },
    SetPool {
        from: String,
        pool: usize,
        weight: u64,
        #[serde(default)]
        with_update: bool,
    },
    SetEmissionRate { from: String, rate: String },
    UpdatePool { from: String, pool: usize },
    MassUpdatePools { from: String },
    Deposit { from: String, pool: usize, amount: String },
    Withdraw { from: String, pool: usize, amount: String },
    EmergencyWithdraw { from: String, pool: usize },
    /// Read-only: record a user's pending reward at the current height.
    Pending { pool: usize, user: String },
    Mine { blocks: u64 },
    MineTo { height: u64 },
    AdvanceTime { secs: u64 },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Mint { .. } => "mint",
            Step::Burn { .. } => "burn",
            Step::AddMinter { .. } => "add_minter",
            Step::RemoveMinter { .. } => "remove_minter",
            Step::MintFunds { .. } => "mint_funds",
            Step::MintGameFund { .. } => "mint_game_fund",
            Step::CreateToken { .. } => "create_token",
            Step::Faucet { .. } => "faucet",
            Step::Approve { .. } => "approve",
            Step::Transfer { .. } => "transfer",
            Step::AddPool { .. } => "add_pool",
            Step::SetPool { .. } => "set_pool",
            Step::SetEmissionRate { .. } => "set_emission_rate",
            Step::UpdatePool { .. } => "update_pool",
            Step::MassUpdatePools { .. } => "mass_update_pools",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::EmergencyWithdraw { .. } => "emergency_withdraw",
            Step::Pending { .. } => "pending",
            Step::Mine { .. } => "mine",
            Step::MineTo { .. } => "mine_to",
            Step::AdvanceTime { .. } => "advance_time",
        }
    }

    /// The principal issuing the step, if it is a transaction.
    pub fn caller(&self) -> Option<&str> {
        match self {
            Step::Mint { from, .. }
            | Step::Burn { from, .. }
            | Step::AddMinter { from, .. }
            | Step::RemoveMinter { from, .. }
            | Step::MintFunds { from, .. }
            | Step::MintGameFund { from }
            | Step::CreateToken { from, .. }
            | Step::Approve { from, .. }
            | Step::Transfer { from, .. }
            | Step::AddPool { from, .. }
            | Step::SetPool { from, .. }
            | Step::SetEmissionRate { from, .. }
            | Step::UpdatePool { from, .. }
            | Step::MassUpdatePools { from }
            | Step::Deposit { from, .. }
            | Step::Withdraw { from, .. }
            | Step::EmergencyWithdraw { from, .. } => Some(from.as_str()),
            Step::Faucet { to, .. } => Some(to.as_str()),
            Step::Pending { .. } | Step::Mine { .. } | Step::MineTo { .. } | Step::AdvanceTime { .. } => None,
        }
    }
}

/// A deployment plus the steps to replay on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &str) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(contents)?)
    }
}

/// Outcome of one replayed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub height: u64,
    pub action: String,
    pub caller: String,
    /// `None` when the step succeeded.
    pub error: Option<String>,
    /// Human-readable result, e.g. the reward paid by a withdrawal.
    pub detail: String,
}

/// Replays scenario steps on a chain, resolving labels as it goes.
pub struct Runner {
    chain: Chain,
    /// Labels seen as principals, in first-seen order.
    principals: Vec<(String, Address)>,
    fail_fast: bool,
}

fn amount(value: &str) -> Result<u128, BearnError> {
    Ok(Bfi::parse(value)?.wei)
}

fn bfi(wei: u128) -> String {
    Bfi::from_wei(wei).to_string()
}

impl Runner {
    pub fn new(config: &DeploymentConfig, fail_fast: bool) -> Result<Self, ScenarioError> {
        let deployment = config.to_deployment().map_err(ScenarioError::Deployment)?;
        let chain = Chain::deploy(deployment).map_err(ScenarioError::Deployment)?;
        let deployer = chain.deployer();
        Ok(Self {
            chain,
            principals: vec![(config.deployer.clone(), deployer)],
            fail_fast,
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn principals(&self) -> &[(String, Address)] {
        &self.principals
    }

    fn principal(&mut self, name: &str) -> Result<Address, BearnError> {
        if name == "ledger" {
            return Ok(self.chain.ledger().address());
        }
        let address = resolve_principal(name)?;
        if !self.principals.iter().any(|(_, a)| *a == address) {
            self.principals.push((name.to_string(), address));
        }
        Ok(address)
    }

    fn token(&self, name: &str) -> Result<Address, BearnError> {
        if name.eq_ignore_ascii_case("bfi") {
            return Ok(self.chain.reward_token().address());
        }
        if name.starts_with("0x") {
            return Address::from_hex(name);
        }
        Ok(Address::from_label(&name.to_lowercase()))
    }

    /// `amount` of a pool's deposit token, in that token's decimals and symbol.
    fn deposit_amount(&self, pool_id: usize, amount: u128) -> String {
        let token = self
            .chain
            .ledger()
            .pool_info(pool_id)
            .ok()
            .and_then(|pool| self.chain.state().deposit_tokens.get(&pool.deposit_token));
        match token {
            Some(token) => format!("{} {}", decimal_units(amount, token.decimals()), token.symbol()),
            None => format!("{} deposit units", amount),
        }
    }

    /// Replay every step in order.
    pub fn run(&mut self, steps: &[Step]) -> Result<Vec<StepRecord>, ScenarioError> {
        let mut records = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let result = self.apply(step);
            let record = StepRecord {
                index,
                height: self.chain.height(),
                action: step.name().to_string(),
                caller: step.caller().unwrap_or("-").to_string(),
                error: result.as_ref().err().map(|e| e.to_string()),
                detail: result.as_ref().cloned().unwrap_or_default(),
            };
            if let Err(e) = result {
                if self.fail_fast {
                    return Err(ScenarioError::Reverted {
                        index,
                        action: step.name().to_string(),
                        source: e,
                    });
                }
            }
            records.push(record);
        }
        tracing::info!("Replayed {} steps, chain at height {}", steps.len(), self.chain.height());
        Ok(records)
    }

    fn apply(&mut self, step: &Step) -> Result<String, BearnError> {
        match step {
            Step::Mint { from, to, amount: value } => {
                let (from, to) = (self.principal(from)?, self.principal(to)?);
                let value = amount(value)?;
                self.chain.mint(from, &to, value)?;
                Ok(format!("minted {}", bfi(value)))
            }
            Step::Burn { from, amount: value } => {
                let from = self.principal(from)?;
                let value = amount(value)?;
                self.chain.burn(from, value)?;
                Ok(format!("burned {}", bfi(value)))
            }
            Step::AddMinter { from, minter } => {
                let (from, minter) = (self.principal(from)?, self.principal(minter)?);
                self.chain.add_minter(from, &minter)?;
                Ok(String::new())
            }
            Step::RemoveMinter { from, minter } => {
                let (from, minter) = (self.principal(from)?, self.principal(minter)?);
                self.chain.remove_minter(from, &minter)?;
                Ok(String::new())
            }
            Step::MintFunds { from, amount: value } => {
                let from = self.principal(from)?;
                let release = self.chain.mint_funds(from, amount(value)?)?;
                Ok(format!(
                    "public {}, community {}, team {}",
                    bfi(release.public),
                    bfi(release.community),
                    bfi(release.team)
                ))
            }
            Step::MintGameFund { from } => {
                let from = self.principal(from)?;
                let released = self.chain.mint_game_fund(from)?;
                Ok(format!("released {}", bfi(released)))
            }
            Step::CreateToken { from, name, symbol, decimals } => {
                let from = self.principal(from)?;
                let address = self.chain.create_token(from, name, symbol, *decimals)?;
                Ok(format!("{} at {}", symbol, address.short()))
            }
            Step::Faucet { to, token, amount: value } => {
                let (to, token) = (self.principal(to)?, self.token(token)?);
                self.chain.faucet(to, &token, amount(value)?)?;
                Ok(String::new())
            }
            Step::Approve { from, token, spender, amount: value } => {
                let (from, spender) = (self.principal(from)?, self.principal(spender)?);
                let token = self.token(token)?;
                let value = match value {
                    Some(v) => amount(v)?,
                    None => UNLIMITED_ALLOWANCE,
                };
                self.chain.approve(from, &token, &spender, value)?;
                Ok(String::new())
            }
            Step::Transfer { from, token, to, amount: value } => {
                let (from, to) = (self.principal(from)?, self.principal(to)?);
                let token = self.token(token)?;
                self.chain.transfer(from, &token, &to, amount(value)?)?;
                Ok(String::new())
            }
            Step::AddPool { from, token, weight, with_update, last_accrual_height } => {
                let from = self.principal(from)?;
                let token = self.token(token)?;
                let pool_id = self.chain.add_pool(from, *weight, token, *with_update, *last_accrual_height)?;
                Ok(format!("pool {}", pool_id))
            }
            Step::SetPool { from, pool, weight, with_update } => {
                let from = self.principal(from)?;
                self.chain.set_pool(from, *pool, *weight, *with_update)?;
                Ok(format!("total weight {}", self.chain.ledger().total_alloc_weight()))
            }
            Step::SetEmissionRate { from, rate } => {
                let from = self.principal(from)?;
                let rate = amount(rate)?;
                self.chain.set_emission_rate(from, rate)?;
                Ok(format!("{} per block", bfi(rate)))
            }
            Step::UpdatePool { from, pool } => {
                let from = self.principal(from)?;
                self.chain.update_pool(from, *pool)?;
                Ok(String::new())
            }
            Step::MassUpdatePools { from } => {
                let from = self.principal(from)?;
                self.chain.mass_update_pools(from)?;
                Ok(String::new())
            }
            Step::Deposit { from, pool, amount: value } => {
                let from = self.principal(from)?;
                let settlement = self.chain.deposit(from, *pool, amount(value)?)?;
                Ok(format!("reward paid {}", bfi(settlement.reward_paid)))
            }
            Step::Withdraw { from, pool, amount: value } => {
                let from = self.principal(from)?;
                let settlement = self.chain.withdraw(from, *pool, amount(value)?)?;
                Ok(format!("reward paid {}", bfi(settlement.reward_paid)))
            }
            Step::EmergencyWithdraw { from, pool } => {
                let from = self.principal(from)?;
                let settlement = self.chain.emergency_withdraw(from, *pool)?;
                Ok(format!("returned {}", self.deposit_amount(*pool, settlement.amount)))
            }
            Step::Pending { pool, user } => {
                let user = self.principal(user)?;
                let pending = self.chain.pending_reward(*pool, &user)?;
                Ok(format!("pending {}", bfi(pending)))
            }
            Step::Mine { blocks } => {
                self.chain.mine(*blocks);
                Ok(String::new())
            }
            Step::MineTo { height } => {
                let mined = self.chain.mine_to(*height);
                Ok(format!("mined {}", mined))
            }
            Step::AdvanceTime { secs } => {
                self.chain.advance_time(*secs);
                Ok(format!("timestamp {}", self.chain.timestamp()))
            }
        }
    }
}
