// crates/bearn-core/src/traits.rs

use crate::error::BearnError;
use crate::identity::Address;

/// Transfer/allowance-based fungible token.
///
/// Implemented by the reward token and by every deposit token a pool accepts.
/// Deposit tokens are external collaborators: the ledger finishes its own
/// bookkeeping before calling any of the mutating methods.
pub trait FungibleToken {
    /// The token contract's own address. Pools are keyed by it.
    fn address(&self) -> Address;

    /// Balance held by `owner`, in base units.
    fn balance_of(&self, owner: &Address) -> u128;

    /// Amount `spender` may still move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Move `amount` from `from` to `to`. `from` is the authenticated caller.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), BearnError>;

    /// Let `spender` move up to `amount` of `owner`'s balance.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), BearnError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), BearnError>;
}
