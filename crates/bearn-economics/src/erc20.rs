// crates/bearn-economics/src/erc20.rs
//
// Balance and allowance bookkeeping shared by every fungible token on the
// host: the BFI reward token embeds a `BalanceBook`, and `StandardToken` wraps
// one to serve as a pool deposit token.
//
// Every mutating method validates first and writes second, so an error
// leaves the book untouched.

use std::collections::BTreeMap;

use bearn_core::error::BearnError;
use bearn_core::identity::Address;
use bearn_core::traits::FungibleToken;

/// An allowance of `u128::MAX` is never decremented.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

/// Balances, allowances, and total supply of one token.
#[derive(Debug, Clone, Default)]
pub struct BalanceBook {
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
    total_supply: u128,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Create `amount` new units in `to`'s balance.
    ///
    /// Supply limits are the caller's concern; this only guards the integer range.
    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), BearnError> {
        if to.is_zero() {
            return Err(BearnError::InvalidState("mint to the zero address".to_string()));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| BearnError::ArithmeticOverflow("total supply".to_string()))?;
        // A single balance never exceeds total supply, so this cannot overflow.
        let balance = self.balance_of(to) + amount;

        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }

    /// Destroy `amount` units from `from`'s balance.
    pub fn burn(&mut self, from: &Address, amount: u128) -> Result<(), BearnError> {
        let available = self.balance_of(from);
        if amount > available {
            return Err(BearnError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.balances.insert(*from, available - amount);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), BearnError> {
        if to.is_zero() {
            return Err(BearnError::InvalidState(
                "transfer to the zero address".to_string(),
            ));
        }
        let available = self.balance_of(from);
        if amount > available {
            return Err(BearnError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.balances.insert(*from, available - amount);
        let credited = self.balance_of(to) + amount;
        self.balances.insert(*to, credited);
        Ok(())
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), BearnError> {
        if spender.is_zero() {
            return Err(BearnError::InvalidState(
                "approve to the zero address".to_string(),
            ));
        }
        self.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), BearnError> {
        let approved = self.allowance(from, spender);
        if amount > approved {
            return Err(BearnError::InsufficientAllowance {
                requested: amount,
                approved,
            });
        }
        self.transfer(from, to, amount)?;
        if approved != UNLIMITED_ALLOWANCE {
            self.allowances.insert((*from, *spender), approved - amount);
        }
        Ok(())
    }
}

/// A plain fungible token with an open faucet.
///
/// Stands in for arbitrary third-party deposit tokens (stablecoins, LP
/// shares) on the in-process host.
#[derive(Debug, Clone)]
pub struct StandardToken {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    book: BalanceBook,
}

impl StandardToken {
    pub fn new(address: Address, name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            book: BalanceBook::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> u128 {
        self.book.total_supply()
    }

    /// Mint test balance to anyone. No access control.
    pub fn faucet(&mut self, to: &Address, amount: u128) -> Result<(), BearnError> {
        self.book.mint(to, amount)
    }
}

impl FungibleToken for StandardToken {
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

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_mint_and_burn() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 100).unwrap();
        assert_eq!(book.balance_of(&alice()), 100);
        assert_eq!(book.total_supply(), 100);

        book.burn(&alice(), 40).unwrap();
        assert_eq!(book.balance_of(&alice()), 60);
        assert_eq!(book.total_supply(), 60);
    }

    #[test]
    fn test_burn_over_balance_leaves_book_unchanged() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 10).unwrap();
        let err = book.burn(&alice(), 100).unwrap_err();
        assert_eq!(
            err,
            BearnError::InsufficientBalance {
                requested: 100,
                available: 10
            }
        );
        assert_eq!(book.balance_of(&alice()), 10);
        assert_eq!(book.total_supply(), 10);
    }

    #[test]
    fn test_mint_to_zero_address_rejected() {
        let mut book = BalanceBook::new();
        assert!(book.mint(&Address::ZERO, 1).is_err());
        assert_eq!(book.total_supply(), 0);
    }

    #[test]
    fn test_transfer_to_self_is_noop() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 10).unwrap();
        book.transfer(&alice(), &alice(), 10).unwrap();
        assert_eq!(book.balance_of(&alice()), 10);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 100).unwrap();
        book.approve(&alice(), &bob(), 30).unwrap();

        book.transfer_from(&bob(), &alice(), &bob(), 20).unwrap();
        assert_eq!(book.balance_of(&bob()), 20);
        assert_eq!(book.allowance(&alice(), &bob()), 10);

        let err = book.transfer_from(&bob(), &alice(), &bob(), 20).unwrap_err();
        assert!(matches!(err, BearnError::InsufficientAllowance { .. }));
        assert_eq!(book.balance_of(&alice()), 80);
    }

    #[test]
    fn test_unlimited_allowance_not_decremented() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 100).unwrap();
        book.approve(&alice(), &bob(), UNLIMITED_ALLOWANCE).unwrap();
        book.transfer_from(&bob(), &alice(), &bob(), 60).unwrap();
        assert_eq!(book.allowance(&alice(), &bob()), UNLIMITED_ALLOWANCE);
    }

    #[test]
    fn test_transfer_from_over_balance_keeps_allowance() {
        let mut book = BalanceBook::new();
        book.mint(&alice(), 5).unwrap();
        book.approve(&alice(), &bob(), 50).unwrap();
        assert!(book.transfer_from(&bob(), &alice(), &bob(), 10).is_err());
        assert_eq!(book.allowance(&alice(), &bob()), 50);
    }

    #[test]
    fn test_standard_token_faucet() {
        let busd = Address::from_label("busd");
        let mut token = StandardToken::new(busd, "BUSD", "BUSD", 18);
        token.faucet(&bob(), 1_000).unwrap();
        assert_eq!(token.balance_of(&bob()), 1_000);
        assert_eq!(token.address(), busd);
        assert_eq!(token.symbol(), "BUSD");
    }
}
