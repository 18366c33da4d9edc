// crates/bearn-cli/src/config.rs
//
// Deployment configuration for a simulated Bearn chain.
// Loaded from a TOML file or populated with the mainnet launch parameters.
//
// Token amounts are written as decimal BFI strings ("0.1", "210000") and
// parsed exactly into wei.

use std::fs;

use serde::{Deserialize, Serialize};

use bearn_core::error::BearnError;
use bearn_core::identity::Address;
use bearn_economics::reward_token::TokenParams;
use bearn_economics::treasury::{COMMUNITY_FUND_BPS, PUBLIC_FUND_BPS, TEAM_FUND_BPS};
use bearn_economics::{Bfi, Deployment, FundAddresses, FundSplit};

/// Deployment parameters of the reward token, the ledger, and the host chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Label (or 0x address) of the governance principal.
    #[serde(default = "default_deployer")]
    pub deployer: String,

    /// Reward emitted per block, in BFI.
    #[serde(default = "default_emission_per_block")]
    pub emission_per_block: String,

    /// First height at which any pool may emit.
    #[serde(default = "default_start_height")]
    pub start_height: u64,

    #[serde(default)]
    pub genesis_height: u64,

    #[serde(default = "default_genesis_timestamp")]
    pub genesis_timestamp: u64,

    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Mine one block before every transaction.
    #[serde(default = "default_automine")]
    pub automine: bool,

    /// Supply cap, in BFI.
    #[serde(default = "default_cap")]
    pub cap: String,

    /// One-time game-fund reserve, in BFI.
    #[serde(default = "default_game_fund")]
    pub game_fund: String,

    #[serde(default = "default_public_fund_bps")]
    pub public_fund_bps: u16,

    #[serde(default = "default_community_fund_bps")]
    pub community_fund_bps: u16,

    #[serde(default = "default_team_fund_bps")]
    pub team_fund_bps: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_deployer() -> String {
    "deployer".to_string()
}

fn default_emission_per_block() -> String {
    "0.1".to_string()
}

fn default_start_height() -> u64 {
    50
}

fn default_genesis_timestamp() -> u64 {
    1_600_000_000
}

fn default_block_time_secs() -> u64 {
    13
}

fn default_automine() -> bool {
    true
}

fn default_cap() -> String {
    "210000".to_string()
}

fn default_game_fund() -> String {
    "10500".to_string()
}

fn default_public_fund_bps() -> u16 {
    PUBLIC_FUND_BPS
}

fn default_community_fund_bps() -> u16 {
    COMMUNITY_FUND_BPS
}

fn default_team_fund_bps() -> u16 {
    TEAM_FUND_BPS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            deployer: default_deployer(),
            emission_per_block: default_emission_per_block(),
            start_height: default_start_height(),
            genesis_height: 0,
            genesis_timestamp: default_genesis_timestamp(),
            block_time_secs: default_block_time_secs(),
            automine: default_automine(),
            cap: default_cap(),
            game_fund: default_game_fund(),
            public_fund_bps: default_public_fund_bps(),
            community_fund_bps: default_community_fund_bps(),
            team_fund_bps: default_team_fund_bps(),
            log_level: default_log_level(),
        }
    }
}

/// Resolve a principal: a `0x`-prefixed hex address, or a label hashed into one.
pub fn resolve_principal(name: &str) -> Result<Address, BearnError> {
    if name.starts_with("0x") {
        Address::from_hex(name)
    } else {
        Ok(Address::from_label(name))
    }
}

impl DeploymentConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DeploymentConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate and convert into chain deployment parameters.
    pub fn to_deployment(&self) -> Result<Deployment, BearnError> {
        let parse = |field: &str, value: &str| {
            Bfi::parse(value)
                .map(|b| b.wei)
                .map_err(|e| BearnError::Config(format!("{}: {}", field, e)))
        };
        let cap = parse("cap", &self.cap)?;
        let game_fund_amount = parse("game_fund", &self.game_fund)?;
        let emission_rate = parse("emission_per_block", &self.emission_per_block)?;
        if game_fund_amount > cap {
            return Err(BearnError::Config(
                "game_fund cannot exceed cap".to_string(),
            ));
        }
        let fund_split = FundSplit::new(
            self.public_fund_bps,
            self.community_fund_bps,
            self.team_fund_bps,
        )?;

        Ok(Deployment {
            deployer: resolve_principal(&self.deployer)?,
            token: TokenParams {
                cap,
                fund_split,
                game_fund_amount,
                funds: FundAddresses::default(),
            },
            emission_rate,
            start_height: self.start_height,
            genesis_height: self.genesis_height,
            genesis_timestamp: self.genesis_timestamp,
            block_time_secs: self.block_time_secs,
            automine: self.automine,
            ..Deployment::default()
        })
    }
}
