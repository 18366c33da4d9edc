// crates/bearn-economics/src/ledger.rs
//
// The reward ledger ("chef"): multi-pool staking with lazy reward accrual.
//
// Each pool carries its own last-accrued height and reward-per-share
// accumulator. Reward is only computed when a pool is touched, so the cost of
// every operation is independent of the number of stakers.
//
// Every mutating operation runs in three steps:
//   1. Plan: compute the accrual, the caller's settlement, and the new
//      position without touching state, and run every check that can fail.
//   2. Effects: write pool, position, and total-weight bookkeeping.
//   3. Interactions: mint into custody, pay reward, move deposit tokens.
// Deposit tokens are external code; nothing of ours is left half-written when
// control reaches them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bearn_core::error::BearnError;
use bearn_core::identity::{Address, CallContext};
use bearn_core::traits::FungibleToken;

use crate::emission::{acc_increment, interval_reward};
use crate::reward_token::RewardToken;
use crate::staking::{Pool, UserPosition};
use crate::token::Bfi;

/// Outcome of a deposit, withdrawal, or emergency withdrawal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Deposit tokens moved in (deposit) or out (withdrawals).
    pub amount: u128,
    /// Reward tokens paid to the caller.
    pub reward_paid: u128,
}

/// Planned accrual of one pool at one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Accrual {
    /// New last-accrued height, or `None` when the call is a no-op.
    advance_to: Option<u64>,
    /// Whether the pool enters the Started phase.
    starts: bool,
    /// Reward to mint into custody.
    reward: u128,
    /// Accumulator value after the accrual.
    acc_reward_per_share: u128,
}

/// Planned accrual of every pool, applied in index order.
#[derive(Debug, Clone)]
struct MassUpdate {
    accruals: Vec<Accrual>,
    total_alloc_weight: u64,
    reward: u128,
}

fn overflow(what: &str) -> BearnError {
    BearnError::ArithmeticOverflow(what.to_string())
}

/// The multi-pool reward ledger.
#[derive(Debug, Clone)]
pub struct RewardLedger {
    address: Address,
    governance: Address,
    reward_token: Address,
    /// Reward wei emitted per block across all started pools.
    emission_rate: u128,
    start_height: u64,
    /// Sum of `alloc_weight` over started pools.
    total_alloc_weight: u64,
    pools: Vec<Pool>,
    /// Positions per pool, indexed like `pools`.
    positions: Vec<BTreeMap<Address, UserPosition>>,
}

impl RewardLedger {
    /// Deploy an empty ledger.
    ///
    /// `address` is the ledger's own custody principal: it must hold the
    /// minter role on the reward token before any reward can accrue.
    pub fn new(
        address: Address,
        governance: Address,
        reward_token: Address,
        emission_rate: u128,
        start_height: u64,
    ) -> Result<Self, BearnError> {
        if governance.is_zero() || address.is_zero() {
            return Err(BearnError::InvalidState(
                "ledger and governance addresses cannot be zero".to_string(),
            ));
        }
        tracing::info!(
            "Reward ledger deployed at {} ({} per block from height {})",
            address.short(),
            Bfi::from_wei(emission_rate),
            start_height
        );
        Ok(Self {
            address,
            governance,
            reward_token,
            emission_rate,
            start_height,
            total_alloc_weight: 0,
            pools: Vec::new(),
            positions: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn governance(&self) -> Address {
        self.governance
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn emission_rate(&self) -> u128 {
        self.emission_rate
    }

    pub fn start_height(&self) -> u64 {
        self.start_height
    }

    pub fn total_alloc_weight(&self) -> u64 {
        self.total_alloc_weight
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool_info(&self, pool_id: usize) -> Result<&Pool, BearnError> {
        self.pools.get(pool_id).ok_or(BearnError::InvalidPool(pool_id))
    }

    pub fn user_info(&self, pool_id: usize, user: &Address) -> Result<UserPosition, BearnError> {
        self.pool_info(pool_id)?;
        Ok(self.position(pool_id, user))
    }

    /// Reward `user` would receive from `pool_id` if they settled at `height`.
    ///
    /// Simulates the pool's accrual, including a Pending to Started
    /// transition, without changing state.
    pub fn pending_reward(&self, pool_id: usize, user: &Address, height: u64) -> Result<u128, BearnError> {
        let pool = self.pool_info(pool_id)?;
        let accrual = self.plan_accrual(pool, height, self.total_alloc_weight)?;
        self.position(pool_id, user)
            .pending(accrual.acc_reward_per_share)
    }

    /// Record a position. Empty positions are only written over existing
    /// entries, so calls from non-stakers never grow the map.
    fn store_position(&mut self, pool_id: usize, user: Address, position: UserPosition) {
        let positions = &mut self.positions[pool_id];
        if position.is_empty() && !positions.contains_key(&user) {
            return;
        }
        positions.insert(user, position);
    }

    fn position(&self, pool_id: usize, user: &Address) -> UserPosition {
        self.positions
            .get(pool_id)
            .and_then(|p| p.get(user))
            .copied()
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    fn ensure_governance(&self, caller: &Address) -> Result<(), BearnError> {
        if *caller != self.governance {
            return Err(BearnError::AccessDenied(format!(
                "{} is not the ledger governance",
                caller.short()
            )));
        }
        Ok(())
    }

    fn ensure_reward_token(&self, reward: &RewardToken) -> Result<(), BearnError> {
        if reward.address() != self.reward_token {
            return Err(BearnError::TokenMismatch(format!(
                "reward token {} is not {}",
                reward.address().short(),
                self.reward_token.short()
            )));
        }
        Ok(())
    }

    fn ensure_deposit_token<T: FungibleToken + ?Sized>(pool: &Pool, token: &T) -> Result<(), BearnError> {
        if token.address() != pool.deposit_token {
            return Err(BearnError::TokenMismatch(format!(
                "pool accepts {}, got {}",
                pool.deposit_token.short(),
                token.address().short()
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accrual
    // -----------------------------------------------------------------------

    /// Plan the accrual of `pool` at `height`, given the active total weight.
    fn plan_accrual(&self, pool: &Pool, height: u64, total_alloc_weight: u64) -> Result<Accrual, BearnError> {
        let mut accrual = Accrual {
            advance_to: None,
            starts: false,
            reward: 0,
            acc_reward_per_share: pool.acc_reward_per_share,
        };
        if height <= pool.last_accrual_height {
            return Ok(accrual);
        }
        accrual.advance_to = Some(height);

        // Nothing staked: move the clock so the idle interval is never paid out.
        if pool.total_staked == 0 {
            return Ok(accrual);
        }

        let mut total = total_alloc_weight;
        if !pool.started {
            if height < self.start_height {
                return Ok(accrual);
            }
            // The pool's own weight joins the denominator before its first emission.
            accrual.starts = true;
            total = total
                .checked_add(pool.alloc_weight)
                .ok_or_else(|| overflow("total allocation weight"))?;
        }

        let blocks = height - pool.last_accrual_height;
        accrual.reward = interval_reward(blocks, self.emission_rate, pool.alloc_weight, total)?;
        accrual.acc_reward_per_share = pool
            .acc_reward_per_share
            .checked_add(acc_increment(accrual.reward, pool.total_staked)?)
            .ok_or_else(|| overflow("reward per share"))?;
        Ok(accrual)
    }

    fn apply_accrual(&mut self, pool_id: usize, accrual: &Accrual) {
        let Some(height) = accrual.advance_to else {
            return;
        };
        let pool = &mut self.pools[pool_id];
        if accrual.starts {
            pool.started = true;
            self.total_alloc_weight += pool.alloc_weight;
            tracing::info!(
                "Pool {} started at height {} (total weight {})",
                pool_id,
                height,
                self.total_alloc_weight
            );
        }
        pool.last_accrual_height = height;
        pool.acc_reward_per_share = accrual.acc_reward_per_share;
        if accrual.reward > 0 {
            tracing::debug!(
                "Pool {} accrued {} (acc/share {})",
                pool_id,
                Bfi::from_wei(accrual.reward),
                pool.acc_reward_per_share
            );
        }
    }

    /// Plan accrual of every pool in index order. Pools that start earlier in
    /// the pass raise the denominator seen by later ones.
    fn plan_mass_update(&self, height: u64) -> Result<MassUpdate, BearnError> {
        let mut total = self.total_alloc_weight;
        let mut reward: u128 = 0;
        let mut accruals = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            let accrual = self.plan_accrual(pool, height, total)?;
            if accrual.starts {
                total = total
                    .checked_add(pool.alloc_weight)
                    .ok_or_else(|| overflow("total allocation weight"))?;
            }
            reward = reward
                .checked_add(accrual.reward)
                .ok_or_else(|| overflow("mass update reward"))?;
            accruals.push(accrual);
        }
        Ok(MassUpdate {
            accruals,
            total_alloc_weight: total,
            reward,
        })
    }

    fn commit_mass_update(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        update: MassUpdate,
    ) -> Result<(), BearnError> {
        if update.reward > 0 {
            reward.check_mint(&self.address, update.reward)?;
        }
        for (pool_id, accrual) in update.accruals.iter().enumerate() {
            self.apply_accrual(pool_id, accrual);
        }
        self.mint_to_custody(ctx, reward, update.reward)
    }

    fn mint_to_custody(&self, ctx: &CallContext, reward: &mut RewardToken, amount: u128) -> Result<(), BearnError> {
        if amount == 0 {
            return Ok(());
        }
        reward.mint(&ctx.as_caller(self.address), &self.address, amount)
    }

    /// Pay up to `amount` reward out of custody. Rounding dust can leave
    /// custody a few wei short, so the payout is capped at the balance.
    fn pay_reward(&self, reward: &mut RewardToken, to: &Address, amount: u128) -> Result<u128, BearnError> {
        let paid = amount.min(reward.balance_of(&self.address));
        if paid > 0 {
            reward.transfer(&self.address, to, paid)?;
        }
        Ok(paid)
    }

    /// Bring one pool's accumulator up to the current height.
    ///
    /// Idempotent: a second call at the same height does nothing.
    pub fn update_pool(&mut self, ctx: &CallContext, reward: &mut RewardToken, pool_id: usize) -> Result<(), BearnError> {
        self.ensure_reward_token(reward)?;
        let pool = self.pool_info(pool_id)?;
        let accrual = self.plan_accrual(pool, ctx.height, self.total_alloc_weight)?;
        if accrual.reward > 0 {
            reward.check_mint(&self.address, accrual.reward)?;
        }
        self.apply_accrual(pool_id, &accrual);
        self.mint_to_custody(ctx, reward, accrual.reward)
    }

    /// Bring every pool up to the current height.
    pub fn mass_update_pools(&mut self, ctx: &CallContext, reward: &mut RewardToken) -> Result<(), BearnError> {
        self.ensure_reward_token(reward)?;
        let update = self.plan_mass_update(ctx.height)?;
        self.commit_mass_update(ctx, reward, update)
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    /// Register a pool for `deposit_token`. Returns its id.
    ///
    /// The pool starts Pending. `last_accrual_height` back- or forward-dates
    /// its accrual clock (`None` means the current height); it is raised to
    /// the ledger's start height if earlier. With `with_update`, every
    /// existing pool is settled first so none is paid at the new weights for
    /// blocks that elapsed before this call.
    pub fn add(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        alloc_weight: u64,
        deposit_token: Address,
        with_update: bool,
        last_accrual_height: Option<u64>,
    ) -> Result<usize, BearnError> {
        self.ensure_governance(&ctx.caller)?;
        self.ensure_reward_token(reward)?;
        if deposit_token.is_zero() {
            return Err(BearnError::InvalidState(
                "deposit token cannot be the zero address".to_string(),
            ));
        }
        if self.pools.iter().any(|p| p.deposit_token == deposit_token) {
            return Err(BearnError::DuplicatePool(deposit_token.to_string()));
        }

        if with_update {
            let update = self.plan_mass_update(ctx.height)?;
            self.commit_mass_update(ctx, reward, update)?;
        }

        let last = last_accrual_height
            .unwrap_or(ctx.height)
            .max(self.start_height);
        self.pools.push(Pool::new(deposit_token, alloc_weight, last));
        self.positions.push(BTreeMap::new());

        let pool_id = self.pools.len() - 1;
        tracing::info!(
            "Pool {} added for {} (weight {}, accrues from height {})",
            pool_id,
            deposit_token.short(),
            alloc_weight,
            last
        );
        Ok(pool_id)
    }

    /// Change a pool's allocation weight.
    ///
    /// A started pool moves the total weight by the difference immediately; a
    /// pending pool contributes its new weight when it starts.
    pub fn set(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        pool_id: usize,
        alloc_weight: u64,
        with_update: bool,
    ) -> Result<(), BearnError> {
        self.ensure_governance(&ctx.caller)?;
        self.ensure_reward_token(reward)?;
        let pool = self.pool_info(pool_id)?;
        let old_weight = pool.alloc_weight;

        let update = if with_update {
            Some(self.plan_mass_update(ctx.height)?)
        } else {
            None
        };
        // A pass over all pools may itself start this one.
        let (started, total) = match &update {
            Some(u) => (pool.started || u.accruals[pool_id].starts, u.total_alloc_weight),
            None => (pool.started, self.total_alloc_weight),
        };
        let new_total = if started {
            total
                .checked_sub(old_weight)
                .and_then(|t| t.checked_add(alloc_weight))
                .ok_or_else(|| overflow("total allocation weight"))?
        } else {
            total
        };

        if let Some(update) = update {
            self.commit_mass_update(ctx, reward, update)?;
        }
        self.pools[pool_id].alloc_weight = alloc_weight;
        self.total_alloc_weight = new_total;

        tracing::info!(
            "Pool {} weight {} -> {} (total weight {})",
            pool_id,
            old_weight,
            alloc_weight,
            self.total_alloc_weight
        );
        Ok(())
    }

    /// Change the per-block emission. Every pool settles at the old rate first.
    pub fn set_emission_rate(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        emission_rate: u128,
    ) -> Result<(), BearnError> {
        self.ensure_governance(&ctx.caller)?;
        self.ensure_reward_token(reward)?;
        let update = self.plan_mass_update(ctx.height)?;
        self.commit_mass_update(ctx, reward, update)?;

        tracing::info!(
            "Emission rate {} -> {} per block",
            Bfi::from_wei(self.emission_rate),
            Bfi::from_wei(emission_rate)
        );
        self.emission_rate = emission_rate;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Staking
    // -----------------------------------------------------------------------

    /// Stake `amount` of the pool's deposit token, paying out pending reward.
    ///
    /// `amount == 0` is a pure reward claim. The caller must have approved
    /// the ledger for `amount`.
    pub fn deposit<T: FungibleToken + ?Sized>(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        token: &mut T,
        pool_id: usize,
        amount: u128,
    ) -> Result<Settlement, BearnError> {
        self.ensure_reward_token(reward)?;
        let pool = self.pool_info(pool_id)?;
        Self::ensure_deposit_token(pool, token)?;

        let accrual = self.plan_accrual(pool, ctx.height, self.total_alloc_weight)?;
        if accrual.reward > 0 {
            reward.check_mint(&self.address, accrual.reward)?;
        }

        let position = self.position(pool_id, &ctx.caller);
        let pending = position.pending(accrual.acc_reward_per_share)?;
        let staked = position
            .amount_staked
            .checked_add(amount)
            .ok_or_else(|| overflow("staked amount"))?;
        let total_staked = pool
            .total_staked
            .checked_add(amount)
            .ok_or_else(|| overflow("pool stake"))?;
        let updated = UserPosition::settled(staked, accrual.acc_reward_per_share)?;

        if amount > 0 {
            let available = token.balance_of(&ctx.caller);
            if amount > available {
                return Err(BearnError::InsufficientBalance {
                    requested: amount,
                    available,
                });
            }
            let approved = token.allowance(&ctx.caller, &self.address);
            if amount > approved {
                return Err(BearnError::InsufficientAllowance {
                    requested: amount,
                    approved,
                });
            }
        }

        self.apply_accrual(pool_id, &accrual);
        self.pools[pool_id].total_staked = total_staked;
        self.store_position(pool_id, ctx.caller, updated);

        self.mint_to_custody(ctx, reward, accrual.reward)?;
        let reward_paid = self.pay_reward(reward, &ctx.caller, pending)?;
        if amount > 0 {
            token.transfer_from(&self.address, &ctx.caller, &self.address, amount)?;
        }

        tracing::debug!(
            "{} deposited {} into pool {} (reward paid {})",
            ctx.caller.short(),
            amount,
            pool_id,
            Bfi::from_wei(reward_paid)
        );
        Ok(Settlement { amount, reward_paid })
    }

    /// Unstake `amount`, paying out pending reward.
    pub fn withdraw<T: FungibleToken + ?Sized>(
        &mut self,
        ctx: &CallContext,
        reward: &mut RewardToken,
        token: &mut T,
        pool_id: usize,
        amount: u128,
    ) -> Result<Settlement, BearnError> {
        self.ensure_reward_token(reward)?;
        let pool = self.pool_info(pool_id)?;
        Self::ensure_deposit_token(pool, token)?;

        let position = self.position(pool_id, &ctx.caller);
        if amount > position.amount_staked {
            return Err(BearnError::InsufficientBalance {
                requested: amount,
                available: position.amount_staked,
            });
        }

        let accrual = self.plan_accrual(pool, ctx.height, self.total_alloc_weight)?;
        if accrual.reward > 0 {
            reward.check_mint(&self.address, accrual.reward)?;
        }

        let pending = position.pending(accrual.acc_reward_per_share)?;
        // amount <= amount_staked <= total_staked
        let updated = UserPosition::settled(position.amount_staked - amount, accrual.acc_reward_per_share)?;
        let total_staked = pool.total_staked - amount;

        self.apply_accrual(pool_id, &accrual);
        self.pools[pool_id].total_staked = total_staked;
        self.store_position(pool_id, ctx.caller, updated);

        self.mint_to_custody(ctx, reward, accrual.reward)?;
        let reward_paid = self.pay_reward(reward, &ctx.caller, pending)?;
        if amount > 0 {
            token.transfer(&self.address, &ctx.caller, amount)?;
        }

        tracing::debug!(
            "{} withdrew {} from pool {} (reward paid {})",
            ctx.caller.short(),
            amount,
            pool_id,
            Bfi::from_wei(reward_paid)
        );
        Ok(Settlement { amount, reward_paid })
    }

    /// Return the caller's whole stake without touching the reward path.
    ///
    /// Pending reward is forfeited. Works even when accrual itself would fail,
    /// e.g. with the reward token at its cap or the minter role revoked.
    pub fn emergency_withdraw<T: FungibleToken + ?Sized>(
        &mut self,
        ctx: &CallContext,
        token: &mut T,
        pool_id: usize,
    ) -> Result<Settlement, BearnError> {
        let pool = self.pool_info(pool_id)?;
        Self::ensure_deposit_token(pool, token)?;

        let position = self.position(pool_id, &ctx.caller);
        if position.is_empty() {
            return Ok(Settlement::default());
        }
        let amount = position.amount_staked;
        let total_staked = pool.total_staked - amount;

        self.pools[pool_id].total_staked = total_staked;
        self.store_position(pool_id, ctx.caller, UserPosition::default());

        if amount > 0 {
            token.transfer(&self.address, &ctx.caller, amount)?;
        }

        tracing::warn!(
            "{} emergency-withdrew {} from pool {}, forfeiting reward",
            ctx.caller.short(),
            amount,
            pool_id
        );
        Ok(Settlement {
            amount,
            reward_paid: 0,
        })
    }
}
