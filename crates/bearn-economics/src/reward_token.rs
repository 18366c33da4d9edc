// crates/bearn-economics/src/reward_token.rs
//
// BFI: the capped reward token.
//
// - Supply is capped at 210,000 BFI; no mint path can exceed it.
// - Governance and any address in the minter set may mint. The reward ledger
//   is granted the minter role at deployment.
// - Governance may mint a scheduled treasury release once every 72 hours,
//   split across the public, community, and team funds.
// - A fixed game-fund reserve (5% of cap) is carved out of the cap and released
//   once, separately from scheduled releases.

use std::collections::BTreeSet;

use bearn_core::error::BearnError;
use bearn_core::identity::{Address, CallContext};
use bearn_core::traits::FungibleToken;

use crate::erc20::BalanceBook;
use crate::token::{Bfi, WEI_PER_BFI};
use crate::treasury::{FundAddresses, FundRelease, FundSplit, FUND_RELEASE_COOLDOWN_SECS};

/// Maximum supply of BFI: 210,000 BFI in wei.
pub const MAX_SUPPLY_WEI: u128 = 210_000 * WEI_PER_BFI;

/// Game-fund reserve: 10,500 BFI in wei (5% of the cap).
pub const GAME_FUND_WEI: u128 = 10_500 * WEI_PER_BFI;

/// Deployment parameters of the reward token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParams {
    pub cap: u128,
    pub fund_split: FundSplit,
    pub game_fund_amount: u128,
    pub funds: FundAddresses,
}

impl Default for TokenParams {
    fn default() -> Self {
        Self {
            cap: MAX_SUPPLY_WEI,
            fund_split: FundSplit::default(),
            game_fund_amount: GAME_FUND_WEI,
            funds: FundAddresses::default(),
        }
    }
}

/// The BFI reward token.
#[derive(Debug, Clone)]
pub struct RewardToken {
    address: Address,
    book: BalanceBook,
    cap: u128,
    governance: Address,
    minters: BTreeSet<Address>,
    fund_split: FundSplit,
    funds: FundAddresses,
    game_fund_amount: u128,
    game_fund_released: bool,
    /// Timestamp of the last successful scheduled release, if any.
    last_fund_release_time: Option<u64>,
}

impl RewardToken {
    /// Deploy the token with zero supply.
    ///
    /// # Errors
    /// Returns `BearnError::Config` if the game-fund reserve alone exceeds the
    /// cap or the fund split sums past 100%, and `BearnError::InvalidState` for a zero governance or fund address.
    pub fn new(address: Address, governance: Address, params: TokenParams) -> Result<Self, BearnError> {
        if governance.is_zero() {
            return Err(BearnError::InvalidState(
                "governance cannot be the zero address".to_string(),
            ));
        }
        if params.game_fund_amount > params.cap {
            return Err(BearnError::Config(format!(
                "game fund {} exceeds cap {}",
                Bfi::from_wei(params.game_fund_amount),
                Bfi::from_wei(params.cap)
            )));
        }
        params.fund_split.validate()?;
        params.funds.validate()?;

        tracing::info!(
            "Reward token deployed at {} (cap {}, governance {})",
            address.short(),
            Bfi::from_wei(params.cap),
            governance.short()
        );

        Ok(Self {
            address,
            book: BalanceBook::new(),
            cap: params.cap,
            governance,
            minters: BTreeSet::new(),
            fund_split: params.fund_split,
            funds: params.funds,
            game_fund_amount: params.game_fund_amount,
            game_fund_released: false,
            last_fund_release_time: None,
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn cap(&self) -> u128 {
        self.cap
    }

    pub fn total_supply(&self) -> u128 {
        self.book.total_supply()
    }

    /// Remaining headroom under the cap.
    pub fn mintable(&self) -> u128 {
        self.cap - self.book.total_supply()
    }

    pub fn governance(&self) -> Address {
        self.governance
    }

    pub fn is_minter(&self, who: &Address) -> bool {
        self.minters.contains(who)
    }

    pub fn minters(&self) -> impl Iterator<Item = &Address> {
        self.minters.iter()
    }

    pub fn fund_split(&self) -> FundSplit {
        self.fund_split
    }

    pub fn funds(&self) -> FundAddresses {
        self.funds
    }

    pub fn game_fund_amount(&self) -> u128 {
        self.game_fund_amount
    }

    pub fn game_fund_released(&self) -> bool {
        self.game_fund_released
    }

    pub fn last_fund_release_time(&self) -> Option<u64> {
        self.last_fund_release_time
    }

    // -----------------------------------------------------------------------
    // Access control
    // -----------------------------------------------------------------------

    fn ensure_governance(&self, caller: &Address) -> Result<(), BearnError> {
        if *caller != self.governance {
            return Err(BearnError::AccessDenied(format!(
                "{} is not governance",
                caller.short()
            )));
        }
        Ok(())
    }

    fn ensure_minter(&self, caller: &Address) -> Result<(), BearnError> {
        if *caller != self.governance && !self.minters.contains(caller) {
            return Err(BearnError::AccessDenied(format!(
                "{} is neither governance nor minter",
                caller.short()
            )));
        }
        Ok(())
    }

    /// Check that `caller` could mint `amount` right now, without minting.
    ///
    /// The reward ledger calls this before committing any of its own
    /// bookkeeping so that a failed mint never strands a half-applied update.
    pub fn check_mint(&self, caller: &Address, amount: u128) -> Result<(), BearnError> {
        self.ensure_minter(caller)?;
        self.ensure_headroom(amount, 0)
    }

    fn ensure_headroom(&self, amount: u128, reserved: u128) -> Result<(), BearnError> {
        let available = self.mintable().saturating_sub(reserved);
        if amount > available {
            return Err(BearnError::CapExceeded {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Governed minting
    // -----------------------------------------------------------------------

    /// Mint `amount` to `to`.
    ///
    /// # Errors
    /// - `AccessDenied` if the caller is neither governance nor a minter.
    /// - `CapExceeded` if total supply would exceed the cap.
    pub fn mint(&mut self, ctx: &CallContext, to: &Address, amount: u128) -> Result<(), BearnError> {
        self.check_mint(&ctx.caller, amount)?;
        self.book.mint(to, amount)?;
        tracing::debug!(
            "Minted {} to {} by {} (supply {})",
            Bfi::from_wei(amount),
            to.short(),
            ctx.caller.short(),
            Bfi::from_wei(self.total_supply())
        );
        Ok(())
    }

    /// Destroy `amount` of the caller's own balance.
    pub fn burn(&mut self, ctx: &CallContext, amount: u128) -> Result<(), BearnError> {
        self.book.burn(&ctx.caller, amount)?;
        tracing::debug!("Burned {} from {}", Bfi::from_wei(amount), ctx.caller.short());
        Ok(())
    }

    /// Grant the minter role. Idempotent.
    pub fn add_minter(&mut self, ctx: &CallContext, minter: &Address) -> Result<(), BearnError> {
        self.ensure_governance(&ctx.caller)?;
        if self.minters.insert(*minter) {
            tracing::info!("Minter role granted to {}", minter.short());
        }
        Ok(())
    }

    /// Revoke the minter role. Idempotent.
    pub fn remove_minter(&mut self, ctx: &CallContext, minter: &Address) -> Result<(), BearnError> {
        self.ensure_governance(&ctx.caller)?;
        if self.minters.remove(minter) {
            tracing::info!("Minter role revoked from {}", minter.short());
        }
        Ok(())
    }

    /// Replace the treasury wallets.
    pub fn set_fund_addresses(&mut self, ctx: &CallContext, funds: FundAddresses) -> Result<(), BearnError> {
        self.ensure_governance(&ctx.caller)?;
        funds.validate()?;
        self.funds = funds;
        tracing::info!("Fund addresses updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Treasury releases
    // -----------------------------------------------------------------------

    /// Mint a scheduled treasury release of `amount`, split by `fund_split`.
    ///
    /// While the game fund is unreleased, its reserve stays carved out of the
    /// headroom: a release that would eat into it is rejected.
    ///
    /// # Errors
    /// - `AccessDenied` if the caller is not governance.
    /// - `CooldownNotElapsed` if the previous release was less than 72h ago.
    /// - `CapExceeded` if the release plus the unreleased reserve exceeds the headroom.
    pub fn mint_funds(&mut self, ctx: &CallContext, amount: u128) -> Result<FundRelease, BearnError> {
        self.ensure_governance(&ctx.caller)?;

        if let Some(last) = self.last_fund_release_time {
            let elapsed = ctx.timestamp.saturating_sub(last);
            if elapsed < FUND_RELEASE_COOLDOWN_SECS {
                return Err(BearnError::CooldownNotElapsed {
                    remaining_secs: FUND_RELEASE_COOLDOWN_SECS - elapsed,
                });
            }
        }

        let release = self.fund_split.apply(amount)?;
        let reserved = if self.game_fund_released {
            0
        } else {
            self.game_fund_amount
        };
        self.ensure_headroom(release.total(), reserved)?;

        // Headroom was checked for the sum, so none of these can fail.
        let funds = self.funds;
        for (to, share) in [
            (funds.public, release.public),
            (funds.community, release.community),
            (funds.team, release.team),
        ] {
            if share > 0 {
                self.book.mint(&to, share)?;
            }
        }
        self.last_fund_release_time = Some(ctx.timestamp);

        tracing::info!(
            "Treasury release of {} minted {} (public {}, community {}, team {})",
            Bfi::from_wei(amount),
            Bfi::from_wei(release.total()),
            Bfi::from_wei(release.public),
            Bfi::from_wei(release.community),
            Bfi::from_wei(release.team)
        );
        Ok(release)
    }

    /// Release the game-fund reserve to the game wallet. One-time.
    pub fn mint_game_fund(&mut self, ctx: &CallContext) -> Result<u128, BearnError> {
        self.ensure_governance(&ctx.caller)?;
        if self.game_fund_released {
            return Err(BearnError::InvalidState(
                "game fund already released".to_string(),
            ));
        }
        let amount = self.game_fund_amount;
        self.ensure_headroom(amount, 0)?;
        if amount > 0 {
            self.book.mint(&self.funds.game, amount)?;
        }
        self.game_fund_released = true;
        tracing::info!("Game fund of {} released", Bfi::from_wei(amount));
        Ok(amount)
    }
}

impl FungibleToken for RewardToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.book.balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.book.allowance(owner, spender)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), BearnError> {
        self.book.transfer(from, to, amount)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), BearnError> {
        self.book.approve(owner, spender, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), BearnError> {
        self.book.transfer_from(spender, from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployer() -> Address {
        Address::from_label("deployer")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn minter() -> Address {
        Address::from_label("minter")
    }

    fn ctx(caller: Address, timestamp: u64) -> CallContext {
        CallContext {
            caller,
            height: 1,
            timestamp,
        }
    }

    fn deploy() -> RewardToken {
        RewardToken::new(Address::from_label("bfi"), deployer(), TokenParams::default()).unwrap()
    }

    #[test]
    fn test_constructor_parameters() {
        let token = deploy();
        assert_eq!(token.governance(), deployer());
        assert_eq!(token.cap(), 210_000 * WEI_PER_BFI);
        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.game_fund_amount(), 10_500 * WEI_PER_BFI);
        assert_eq!(token.fund_split(), FundSplit::default());
        assert_eq!(token.last_fund_release_time(), None);
    }

    #[test]
    fn test_mint_by_governance() {
        let mut token = deploy();
        token.mint(&ctx(deployer(), 0), &bob(), 10 * WEI_PER_BFI).unwrap();
        assert_eq!(token.balance_of(&bob()), 10 * WEI_PER_BFI);
        assert_eq!(token.total_supply(), 10 * WEI_PER_BFI);
    }

    #[test]
    fn test_mint_requires_minter_role() {
        let mut token = deploy();
        let err = token.mint(&ctx(minter(), 0), &bob(), 10).unwrap_err();
        assert!(matches!(err, BearnError::AccessDenied(_)));
        assert_eq!(token.total_supply(), 0);

        token.add_minter(&ctx(deployer(), 0), &minter()).unwrap();
        assert!(token.is_minter(&minter()));
        token.mint(&ctx(minter(), 0), &bob(), 10).unwrap();
        assert_eq!(token.balance_of(&bob()), 10);
    }

    #[test]
    fn test_minter_management_is_governance_only_and_idempotent() {
        let mut token = deploy();
        assert!(token.add_minter(&ctx(bob(), 0), &minter()).is_err());

        token.add_minter(&ctx(deployer(), 0), &minter()).unwrap();
        token.add_minter(&ctx(deployer(), 0), &minter()).unwrap();
        assert_eq!(token.minters().count(), 1);

        token.remove_minter(&ctx(deployer(), 0), &minter()).unwrap();
        token.remove_minter(&ctx(deployer(), 0), &minter()).unwrap();
        assert!(!token.is_minter(&minter()));
        assert!(token.mint(&ctx(minter(), 0), &bob(), 1).is_err());
    }

    #[test]
    fn test_mint_past_cap_rejected() {
        let mut token = deploy();
        let cap = token.cap();
        token.mint(&ctx(deployer(), 0), &bob(), cap - 5).unwrap();

        let err = token.mint(&ctx(deployer(), 0), &bob(), 6).unwrap_err();
        assert_eq!(
            err,
            BearnError::CapExceeded {
                requested: 6,
                available: 5
            }
        );
        assert_eq!(token.total_supply(), cap - 5);

        token.mint(&ctx(deployer(), 0), &bob(), 5).unwrap();
        assert_eq!(token.total_supply(), cap);
        assert_eq!(token.mintable(), 0);
    }

    #[test]
    fn test_burn() {
        let mut token = deploy();
        token.mint(&ctx(deployer(), 0), &bob(), 10 * WEI_PER_BFI).unwrap();

        let err = token.burn(&ctx(bob(), 0), 100 * WEI_PER_BFI).unwrap_err();
        assert!(matches!(err, BearnError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&bob()), 10 * WEI_PER_BFI);

        token.burn(&ctx(bob(), 0), 10 * WEI_PER_BFI).unwrap();
        assert_eq!(token.balance_of(&bob()), 0);
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_mint_funds_splits_release() {
        let mut token = deploy();
        let release = token
            .mint_funds(&ctx(deployer(), 1_000), 10 * WEI_PER_BFI)
            .unwrap();
        let funds = token.funds();
        assert_eq!(token.balance_of(&funds.public), release.public);
        assert_eq!(token.balance_of(&funds.community), 2 * WEI_PER_BFI);
        assert_eq!(token.balance_of(&funds.team), release.team);
        assert_eq!(token.balance_of(&funds.game), 0);
        assert_eq!(token.total_supply(), release.total());
        assert_eq!(token.last_fund_release_time(), Some(1_000));
    }

    #[test]
    fn test_mint_funds_cooldown() {
        let mut token = deploy();
        token.mint_funds(&ctx(deployer(), 1_000), 10 * WEI_PER_BFI).unwrap();
        let supply = token.total_supply();

        let err = token
            .mint_funds(&ctx(deployer(), 1_000 + FUND_RELEASE_COOLDOWN_SECS - 1), 10 * WEI_PER_BFI)
            .unwrap_err();
        assert_eq!(err, BearnError::CooldownNotElapsed { remaining_secs: 1 });
        assert_eq!(token.total_supply(), supply);
        assert_eq!(token.last_fund_release_time(), Some(1_000));

        token
            .mint_funds(&ctx(deployer(), 1_000 + FUND_RELEASE_COOLDOWN_SECS), 10 * WEI_PER_BFI)
            .unwrap();
        assert_eq!(
            token.last_fund_release_time(),
            Some(1_000 + FUND_RELEASE_COOLDOWN_SECS)
        );
    }

    #[test]
    fn test_mint_funds_governance_only() {
        let mut token = deploy();
        token.add_minter(&ctx(deployer(), 0), &minter()).unwrap();
        let err = token.mint_funds(&ctx(minter(), 0), 10).unwrap_err();
        assert!(matches!(err, BearnError::AccessDenied(_)));
        assert_eq!(token.last_fund_release_time(), None);
    }

    #[test]
    fn test_mint_funds_keeps_game_reserve_mintable() {
        let mut token = deploy();
        let cap = token.cap();
        let reserve = token.game_fund_amount();
        // Leave exactly the reserve plus 9.5 BFI of headroom.
        token
            .mint(&ctx(deployer(), 0), &bob(), cap - reserve - 9_500_000_000_000_000_000)
            .unwrap();

        let err = token
            .mint_funds(&ctx(deployer(), 0), 20 * WEI_PER_BFI)
            .unwrap_err();
        assert!(matches!(err, BearnError::CapExceeded { .. }));
        assert_eq!(token.last_fund_release_time(), None);

        token.mint_funds(&ctx(deployer(), 0), 10 * WEI_PER_BFI).unwrap();
        assert_eq!(token.mintable(), reserve);

        token.mint_game_fund(&ctx(deployer(), 0)).unwrap();
        assert_eq!(token.total_supply(), cap);
    }

    #[test]
    fn test_game_fund_released_once() {
        let mut token = deploy();
        assert!(token.mint_game_fund(&ctx(bob(), 0)).is_err());

        let amount = token.mint_game_fund(&ctx(deployer(), 0)).unwrap();
        assert_eq!(amount, GAME_FUND_WEI);
        assert_eq!(token.balance_of(&token.funds().game), GAME_FUND_WEI);
        assert!(token.game_fund_released());

        let err = token.mint_game_fund(&ctx(deployer(), 0)).unwrap_err();
        assert!(matches!(err, BearnError::InvalidState(_)));
        assert_eq!(token.total_supply(), GAME_FUND_WEI);
    }

    #[test]
    fn test_set_fund_addresses() {
        let mut token = deploy();
        let mut funds = FundAddresses::default();
        funds.public = Address::from_label("new-public");
        assert!(token.set_fund_addresses(&ctx(bob(), 0), funds).is_err());

        token.set_fund_addresses(&ctx(deployer(), 0), funds).unwrap();
        token.mint_funds(&ctx(deployer(), 0), 10 * WEI_PER_BFI).unwrap();
        assert!(token.balance_of(&Address::from_label("new-public")) > 0);
    }

    #[test]
    fn test_reserve_larger_than_cap_rejected() {
        let params = TokenParams {
            cap: 100,
            game_fund_amount: 101,
            ..TokenParams::default()
        };
        assert!(RewardToken::new(Address::from_label("bfi"), deployer(), params).is_err());
    }

    #[test]
    fn test_split_over_full_rejected_at_deploy() {
        let params = TokenParams {
            fund_split: FundSplit {
                public_bps: 10_000,
                community_bps: 10_000,
                team_bps: 10_000,
            },
            ..TokenParams::default()
        };
        let err = RewardToken::new(Address::from_label("bfi"), deployer(), params).unwrap_err();
        assert!(matches!(err, BearnError::Config(_)));
    }

    #[test]
    fn test_release_never_exceeds_requested_amount() {
        let mut token = deploy();
        let release = token.mint_funds(&ctx(deployer(), 1_000), 10).unwrap();
        assert!(release.total() <= 10);
        assert_eq!(token.total_supply(), release.total());
    }
}
