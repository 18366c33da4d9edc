// crates/bearn-economics/src/emission.rs
//
// Reward emission and per-share accrual arithmetic.
//
// The ledger emits a fixed number of wei per block, shared across started
// pools in proportion to their allocation weight:
//   reward(pool) = blocks * emission_rate * alloc_weight / total_alloc_weight
//
// Each pool converts its reward into a running per-share accumulator, scaled
// by ACC_REWARD_PRECISION so that integer division keeps 12 extra digits:
//   acc_reward_per_share += reward * ACC_REWARD_PRECISION / total_staked
//
// A position's accrued reward is then amount * acc / ACC_REWARD_PRECISION.
// All arithmetic is checked; overflow is an error, never a wrap.

use bearn_core::error::BearnError;

/// Fixed-point scale of `acc_reward_per_share`: 10^12.
pub const ACC_REWARD_PRECISION: u128 = 1_000_000_000_000;

fn overflow(what: &str) -> BearnError {
    BearnError::ArithmeticOverflow(what.to_string())
}

/// Reward (in wei) earned by one pool over `blocks` blocks.
///
/// Returns 0 when no weight is active (`total_alloc_weight == 0`).
pub fn interval_reward(
    blocks: u64,
    emission_rate: u128,
    alloc_weight: u64,
    total_alloc_weight: u64,
) -> Result<u128, BearnError> {
    if total_alloc_weight == 0 {
        return Ok(0);
    }
    let gross = (blocks as u128)
        .checked_mul(emission_rate)
        .and_then(|v| v.checked_mul(alloc_weight as u128))
        .ok_or_else(|| overflow("interval reward"))?;
    Ok(gross / total_alloc_weight as u128)
}

/// Increase of the per-share accumulator for distributing `reward` over `total_staked`.
///
/// Returns 0 for an empty pool; callers never mint into one.
pub fn acc_increment(reward: u128, total_staked: u128) -> Result<u128, BearnError> {
    if total_staked == 0 {
        return Ok(0);
    }
    let scaled = reward
        .checked_mul(ACC_REWARD_PRECISION)
        .ok_or_else(|| overflow("reward per share"))?;
    Ok(scaled / total_staked)
}

/// Reward accrued by `amount` staked units at accumulator value `acc_reward_per_share`.
pub fn accrued(amount: u128, acc_reward_per_share: u128) -> Result<u128, BearnError> {
    amount
        .checked_mul(acc_reward_per_share)
        .map(|v| v / ACC_REWARD_PRECISION)
        .ok_or_else(|| overflow("accrued reward"))
}
