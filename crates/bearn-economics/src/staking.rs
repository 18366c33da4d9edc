// crates/bearn-economics/src/staking.rs
//
// Pool and position records of the reward ledger.
//
// A pool moves through two phases:
//   Pending -> Started
// A pool is Pending from registration until the first accrual at or after
// the ledger's start height; from then on its weight counts toward the
// ledger's total allocation weight. The transition is one-way.

use serde::{Deserialize, Serialize};

use bearn_core::error::BearnError;
use bearn_core::identity::Address;

use crate::emission::accrued;

/// Lifecycle phase of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolPhase {
    /// Registered, not yet counted toward the total allocation weight.
    Pending,
    /// Counted toward the total allocation weight. Terminal.
    Started,
}

/// One staking pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Address of the token this pool accepts.
    pub deposit_token: Address,
    /// Relative share of the ledger's emission.
    pub alloc_weight: u64,
    /// Height up to which reward has been accrued.
    pub last_accrual_height: u64,
    /// Accumulated reward per staked unit, scaled by `ACC_REWARD_PRECISION`.
    /// Never decreases.
    pub acc_reward_per_share: u128,
    /// Whether the pool has entered the Started phase.
    pub started: bool,
    /// Deposit tokens held for this pool's stakers.
    pub total_staked: u128,
}

impl Pool {
    pub fn new(deposit_token: Address, alloc_weight: u64, last_accrual_height: u64) -> Self {
        Self {
            deposit_token,
            alloc_weight,
            last_accrual_height,
            acc_reward_per_share: 0,
            started: false,
            total_staked: 0,
        }
    }

    pub fn phase(&self) -> PoolPhase {
        if self.started {
            PoolPhase::Started
        } else {
            PoolPhase::Pending
        }
    }
}

/// One user's stake in one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Deposit tokens staked.
    pub amount_staked: u128,
    /// Accrued reward already settled at the last deposit or withdrawal.
    pub reward_debt: u128,
}

impl UserPosition {
    /// Reward owed at accumulator value `acc_reward_per_share`.
    ///
    /// The accumulator never decreases, so accrued reward never falls below
    /// the debt recorded against an earlier value.
    pub fn pending(&self, acc_reward_per_share: u128) -> Result<u128, BearnError> {
        Ok(accrued(self.amount_staked, acc_reward_per_share)?.saturating_sub(self.reward_debt))
    }

    /// Position after restaking to `amount_staked` with everything owed settled.
    pub fn settled(amount_staked: u128, acc_reward_per_share: u128) -> Result<Self, BearnError> {
        Ok(Self {
            amount_staked,
            reward_debt: accrued(amount_staked, acc_reward_per_share)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.amount_staked == 0 && self.reward_debt == 0
    }
}
