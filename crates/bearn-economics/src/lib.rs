// crates/bearn-economics/src/lib.rs
//
// bearn-economics: BFI reward token, scheduled treasury releases, emission
// math, and the multi-pool reward ledger for the Bearn incentive engine.
//
// All monetary values are tracked in wei (the smallest unit of BFI).
// 1 BFI = 1,000,000,000,000,000,000 wei (10^18).

pub mod chain;
pub mod emission;
pub mod erc20;
pub mod ledger;
pub mod reward_token;
pub mod staking;
pub mod token;
pub mod treasury;

// Re-export key types for ergonomic access from downstream crates.
pub use chain::{Chain, ChainState, Deployment};
pub use emission::{accrued, acc_increment, interval_reward, ACC_REWARD_PRECISION};
pub use erc20::{BalanceBook, StandardToken};
pub use ledger::{RewardLedger, Settlement};
pub use reward_token::{RewardToken, TokenParams};
pub use staking::{Pool, PoolPhase, UserPosition};
pub use token::{Bfi, DECIMALS, WEI_PER_BFI};
pub use treasury::{FundAddresses, FundRelease, FundSplit, BPS_DENOMINATOR, FUND_RELEASE_COOLDOWN_SECS};
