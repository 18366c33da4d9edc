// crates/bearn-economics/src/chain.rs
//
// In-process host for the reward token, the reward ledger, and mock deposit
// tokens.
//
// The host owns the block clock and executes every state-changing call as an
// atomic transaction: with automine on, the call is included in a freshly
// mined block; if it returns an error, all contract state and the clock are
// restored, so a reverted call has no observable effect.

use std::collections::BTreeMap;

use bearn_core::clock::{ManualClock, TimeSource};
use bearn_core::error::BearnError;
use bearn_core::identity::{Address, CallContext};
use bearn_core::traits::FungibleToken;

use crate::erc20::StandardToken;
use crate::ledger::{RewardLedger, Settlement};
use crate::reward_token::{RewardToken, TokenParams};
use crate::token::WEI_PER_BFI;
use crate::treasury::{FundAddresses, FundRelease};

/// Parameters for deploying the reward token and ledger onto a fresh chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Governance of both the token and the ledger.
    pub deployer: Address,
    pub token_address: Address,
    pub ledger_address: Address,
    pub token: TokenParams,
    /// Reward wei emitted per block.
    pub emission_rate: u128,
    /// First height at which any pool may begin emitting.
    pub start_height: u64,
    pub genesis_height: u64,
    pub genesis_timestamp: u64,
    pub block_time_secs: u64,
    /// Mine one block before every transaction.
    pub automine: bool,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            deployer: Address::from_label("deployer"),
            token_address: Address::from_label("bfi"),
            ledger_address: Address::from_label("bearn-chef"),
            token: TokenParams::default(),
            emission_rate: WEI_PER_BFI / 10,
            start_height: 50,
            genesis_height: 0,
            genesis_timestamp: 1_600_000_000,
            block_time_secs: 13,
            automine: true,
        }
    }
}

/// All contract state on the chain. Cloned to snapshot a transaction.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub reward_token: RewardToken,
    pub ledger: RewardLedger,
    pub deposit_tokens: BTreeMap<Address, StandardToken>,
}

impl ChainState {
    /// Look up any token on the chain, reward token included.
    pub fn token(&self, address: &Address) -> Result<&dyn FungibleToken, BearnError> {
        if *address == self.reward_token.address() {
            return Ok(&self.reward_token);
        }
        self.deposit_tokens
            .get(address)
            .map(|t| t as &dyn FungibleToken)
            .ok_or_else(|| BearnError::InvalidState(format!("unknown token {}", address.short())))
    }

    pub fn token_mut(&mut self, address: &Address) -> Result<&mut dyn FungibleToken, BearnError> {
        if *address == self.reward_token.address() {
            return Ok(&mut self.reward_token);
        }
        self.deposit_tokens
            .get_mut(address)
            .map(|t| t as &mut dyn FungibleToken)
            .ok_or_else(|| BearnError::InvalidState(format!("unknown token {}", address.short())))
    }
}

fn deposit_token<'a>(
    tokens: &'a mut BTreeMap<Address, StandardToken>,
    ledger: &RewardLedger,
    pool_id: usize,
) -> Result<&'a mut StandardToken, BearnError> {
    let address = ledger.pool_info(pool_id)?.deposit_token;
    tokens
        .get_mut(&address)
        .ok_or_else(|| BearnError::InvalidState(format!("pool {} token {} is not deployed", pool_id, address.short())))
}

/// A single-node chain hosting the Bearn contracts.
#[derive(Debug, Clone)]
pub struct Chain {
    clock: ManualClock,
    block_time_secs: u64,
    automine: bool,
    deployer: Address,
    state: ChainState,
}

impl Chain {
    /// Deploy the reward token and ledger and grant the ledger the minter role.
    pub fn deploy(deployment: Deployment) -> Result<Self, BearnError> {
        let clock = ManualClock::new(deployment.genesis_height, deployment.genesis_timestamp);
        let mut reward_token = RewardToken::new(
            deployment.token_address,
            deployment.deployer,
            deployment.token,
        )?;
        let ledger = RewardLedger::new(
            deployment.ledger_address,
            deployment.deployer,
            deployment.token_address,
            deployment.emission_rate,
            deployment.start_height,
        )?;
        reward_token.add_minter(
            &CallContext::new(deployment.deployer, &clock),
            &deployment.ledger_address,
        )?;

        tracing::info!(
            "Chain deployed at height {} (block time {}s, automine {})",
            clock.height(),
            deployment.block_time_secs,
            deployment.automine
        );
        Ok(Self {
            clock,
            block_time_secs: deployment.block_time_secs,
            automine: deployment.automine,
            deployer: deployment.deployer,
            state: ChainState {
                reward_token,
                ledger,
                deposit_tokens: BTreeMap::new(),
            },
        })
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    pub fn height(&self) -> u64 {
        self.clock.height()
    }

    pub fn timestamp(&self) -> u64 {
        self.clock.timestamp()
    }

    pub fn mine(&mut self, blocks: u64) {
        self.clock.mine(blocks, self.block_time_secs);
    }

    /// Mine up to `height`. Returns the number of blocks mined.
    pub fn mine_to(&mut self, height: u64) -> u64 {
        let blocks = height.saturating_sub(self.height());
        self.mine(blocks);
        blocks
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.clock.advance_time(secs);
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn reward_token(&self) -> &RewardToken {
        &self.state.reward_token
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.state.ledger
    }

    pub fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128, BearnError> {
        Ok(self.state.token(token)?.balance_of(owner))
    }

    /// Reward `user` would receive from `pool_id` at the current height.
    pub fn pending_reward(&self, pool_id: usize, user: &Address) -> Result<u128, BearnError> {
        self.state.ledger.pending_reward(pool_id, user, self.height())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Run `call` from `caller` as one atomic transaction.
    pub fn transact<R>(
        &mut self,
        caller: Address,
        call: impl FnOnce(&CallContext, &mut ChainState) -> Result<R, BearnError>,
    ) -> Result<R, BearnError> {
        let clock = self.clock;
        if self.automine {
            self.mine(1);
        }
        let ctx = CallContext::new(caller, &self.clock);
        let snapshot = self.state.clone();

        match call(&ctx, &mut self.state) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.state = snapshot;
                self.clock = clock;
                tracing::warn!(
                    "Transaction from {} reverted at height {}: {}",
                    caller.short(),
                    ctx.height,
                    e
                );
                Err(e)
            }
        }
    }

    /// Deploy a mock deposit token. Its address is derived from the symbol.
    pub fn create_token(&mut self, caller: Address, name: &str, symbol: &str, decimals: u8) -> Result<Address, BearnError> {
        let address = Address::from_label(&symbol.to_lowercase());
        self.transact(caller, |_, state| {
            if address == state.reward_token.address() || state.deposit_tokens.contains_key(&address) {
                return Err(BearnError::InvalidState(format!("token {} already deployed", symbol)));
            }
            state
                .deposit_tokens
                .insert(address, StandardToken::new(address, name, symbol, decimals));
            tracing::info!("Token {} deployed at {}", symbol, address.short());
            Ok(address)
        })
    }

    /// Mint mock deposit tokens to the caller.
    pub fn faucet(&mut self, caller: Address, token: &Address, amount: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state
                .deposit_tokens
                .get_mut(token)
                .ok_or_else(|| BearnError::InvalidState(format!("no faucet for {}", token.short())))?
                .faucet(&ctx.caller, amount)
        })
    }

    pub fn approve(&mut self, caller: Address, token: &Address, spender: &Address, amount: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state.token_mut(token)?.approve(&ctx.caller, spender, amount)
        })
    }

    pub fn transfer(&mut self, caller: Address, token: &Address, to: &Address, amount: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state.token_mut(token)?.transfer(&ctx.caller, to, amount)
        })
    }

    // Reward token

    pub fn mint(&mut self, caller: Address, to: &Address, amount: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.mint(ctx, to, amount))
    }

    pub fn burn(&mut self, caller: Address, amount: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.burn(ctx, amount))
    }

    pub fn add_minter(&mut self, caller: Address, minter: &Address) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.add_minter(ctx, minter))
    }

    pub fn remove_minter(&mut self, caller: Address, minter: &Address) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.remove_minter(ctx, minter))
    }

    pub fn set_fund_addresses(&mut self, caller: Address, funds: FundAddresses) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.set_fund_addresses(ctx, funds))
    }

    pub fn mint_funds(&mut self, caller: Address, amount: u128) -> Result<FundRelease, BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.mint_funds(ctx, amount))
    }

    pub fn mint_game_fund(&mut self, caller: Address) -> Result<u128, BearnError> {
        self.transact(caller, |ctx, state| state.reward_token.mint_game_fund(ctx))
    }

    // Reward ledger

    pub fn add_pool(
        &mut self,
        caller: Address,
        alloc_weight: u64,
        deposit_token: Address,
        with_update: bool,
        last_accrual_height: Option<u64>,
    ) -> Result<usize, BearnError> {
        self.transact(caller, |ctx, state| {
            if !state.deposit_tokens.contains_key(&deposit_token) {
                return Err(BearnError::InvalidState(format!(
                    "token {} is not deployed",
                    deposit_token.short()
                )));
            }
            state.ledger.add(
                ctx,
                &mut state.reward_token,
                alloc_weight,
                deposit_token,
                with_update,
                last_accrual_height,
            )
        })
    }

    pub fn set_pool(&mut self, caller: Address, pool_id: usize, alloc_weight: u64, with_update: bool) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state
                .ledger
                .set(ctx, &mut state.reward_token, pool_id, alloc_weight, with_update)
        })
    }

    pub fn set_emission_rate(&mut self, caller: Address, emission_rate: u128) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state
                .ledger
                .set_emission_rate(ctx, &mut state.reward_token, emission_rate)
        })
    }

    pub fn update_pool(&mut self, caller: Address, pool_id: usize) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state.ledger.update_pool(ctx, &mut state.reward_token, pool_id)
        })
    }

    pub fn mass_update_pools(&mut self, caller: Address) -> Result<(), BearnError> {
        self.transact(caller, |ctx, state| {
            state.ledger.mass_update_pools(ctx, &mut state.reward_token)
        })
    }

    pub fn deposit(&mut self, caller: Address, pool_id: usize, amount: u128) -> Result<Settlement, BearnError> {
        self.transact(caller, |ctx, state| {
            let ChainState {
                reward_token,
                ledger,
                deposit_tokens,
            } = state;
            let token = deposit_token(deposit_tokens, ledger, pool_id)?;
            ledger.deposit(ctx, reward_token, token, pool_id, amount)
        })
    }

    pub fn withdraw(&mut self, caller: Address, pool_id: usize, amount: u128) -> Result<Settlement, BearnError> {
        self.transact(caller, |ctx, state| {
            let ChainState {
                reward_token,
                ledger,
                deposit_tokens,
            } = state;
            let token = deposit_token(deposit_tokens, ledger, pool_id)?;
            ledger.withdraw(ctx, reward_token, token, pool_id, amount)
        })
    }

    pub fn emergency_withdraw(&mut self, caller: Address, pool_id: usize) -> Result<Settlement, BearnError> {
        self.transact(caller, |ctx, state| {
            let ChainState {
                ledger,
                deposit_tokens,
                ..
            } = state;
            let token = deposit_token(deposit_tokens, ledger, pool_id)?;
            ledger.emergency_withdraw(ctx, token, pool_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn chain() -> Chain {
        Chain::deploy(Deployment::default()).unwrap()
    }

    #[test]
    fn test_deploy_grants_ledger_minter() {
        let chain = chain();
        assert!(chain.reward_token().is_minter(&chain.ledger().address()));
        assert_eq!(chain.ledger().governance(), chain.deployer());
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_automine_includes_call_in_next_block() {
        let mut chain = chain();
        let deployer = chain.deployer();
        let t0 = chain.timestamp();
        chain.mint(deployer, &bob(), 10).unwrap();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.timestamp(), t0 + 13);
    }

    #[test]
    fn test_failed_transaction_reverts_state_and_clock() {
        let mut chain = chain();
        let bfi = chain.reward_token().address();
        chain.mint(chain.deployer(), &bob(), 10).unwrap();
        let height = chain.height();

        let err = chain.burn(bob(), 100).unwrap_err();
        assert!(matches!(err, BearnError::InsufficientBalance { .. }));
        assert_eq!(chain.height(), height);
        assert_eq!(chain.balance_of(&bfi, &bob()).unwrap(), 10);
    }

    #[test]
    fn test_partial_effects_are_rolled_back() {
        let mut chain = chain();
        let deployer = chain.deployer();
        let err = chain
            .transact(deployer, |ctx, state| {
                state.reward_token.mint(ctx, &bob(), 5)?;
                Err::<(), _>(BearnError::InvalidState("abort".to_string()))
            })
            .unwrap_err();
        assert_eq!(err, BearnError::InvalidState("abort".to_string()));
        assert_eq!(chain.reward_token().total_supply(), 0);
    }

    #[test]
    fn test_mine_to_never_goes_backwards() {
        let mut chain = chain();
        assert_eq!(chain.mine_to(10), 10);
        assert_eq!(chain.mine_to(5), 0);
        assert_eq!(chain.height(), 10);
    }

    #[test]
    fn test_create_token_rejects_duplicate_symbol() {
        let mut chain = chain();
        let deployer = chain.deployer();
        let busd = chain.create_token(deployer, "BUSD", "BUSD", 18).unwrap();
        assert!(chain.state().deposit_tokens.contains_key(&busd));
        assert!(chain.create_token(deployer, "BUSD", "BUSD", 18).is_err());
    }

    #[test]
    fn test_add_pool_requires_deployed_token() {
        let mut chain = chain();
        let deployer = chain.deployer();
        let err = chain
            .add_pool(deployer, 1000, Address::from_label("nope"), false, None)
            .unwrap_err();
        assert!(matches!(err, BearnError::InvalidState(_)));
        assert_eq!(chain.ledger().pool_length(), 0);
    }
}
