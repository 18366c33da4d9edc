// crates/bearn-economics/tests/chef_scenarios.rs
//
// Reward ledger scenarios on the in-process chain. Every transaction is mined
// into its own block, so heights below are the heights the calls execute at.

use bearn_core::error::BearnError;
use bearn_core::identity::Address;
use bearn_core::traits::FungibleToken;
use bearn_economics::erc20::UNLIMITED_ALLOWANCE;
use bearn_economics::{Bfi, Chain, Deployment, PoolPhase, ACC_REWARD_PRECISION, WEI_PER_BFI};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bob() -> Address {
    Address::from_label("bob")
}

fn carol() -> Address {
    Address::from_label("carol")
}

fn bfi(s: &str) -> u128 {
    Bfi::parse(s).unwrap().wei
}

struct Setup {
    chain: Chain,
    busd: Address,
}

/// Deploy, prefund the ledger, and give `stakers` 1000 BUSD each with an
/// unlimited approval to the ledger.
fn setup(stakers: &[Address]) -> Setup {
    let mut chain = Chain::deploy(Deployment::default()).unwrap();
    let deployer = chain.deployer();
    let ledger = chain.ledger().address();

    chain.mint(deployer, &ledger, bfi("1000")).unwrap();
    let busd = chain.create_token(deployer, "BUSD", "BUSD", 18).unwrap();
    for staker in stakers {
        chain.faucet(*staker, &busd, bfi("1000")).unwrap();
        chain.approve(*staker, &busd, &ledger, UNLIMITED_ALLOWANCE).unwrap();
    }
    Setup { chain, busd }
}

fn bfi_of(chain: &Chain, who: &Address) -> u128 {
    let token = chain.reward_token().address();
    chain.balance_of(&token, who).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_deployment_parameters() {
    let Setup { chain, .. } = setup(&[]);
    let ledger = chain.ledger();
    assert_eq!(ledger.governance(), chain.deployer());
    assert_eq!(ledger.emission_rate(), bfi("0.1"));
    assert_eq!(ledger.start_height(), 50);
    assert_eq!(ledger.total_alloc_weight(), 0);
    assert_eq!(ledger.pool_length(), 0);
}

#[test]
fn test_single_staker_lifecycle() {
    let Setup { mut chain, busd } = setup(&[bob()]);
    let deployer = chain.deployer();

    let pid = chain.add_pool(deployer, 1000, busd, false, Some(100)).unwrap();
    let pool = chain.ledger().pool_info(pid).unwrap();
    assert_eq!(pool.phase(), PoolPhase::Pending);
    assert_eq!(pool.last_accrual_height, 100);

    chain.deposit(bob(), pid, bfi("10")).unwrap();
    assert_eq!(chain.balance_of(&busd, &bob()).unwrap(), bfi("990"));

    chain.mine_to(58);
    assert_eq!(chain.pending_reward(pid, &bob()).unwrap(), 0);

    // Claim at height 110: ten blocks past the pool's accrual height.
    chain.mine_to(109);
    let claimed = chain.withdraw(bob(), pid, 0).unwrap();
    assert_eq!(chain.height(), 110);
    assert_eq!(claimed.reward_paid, bfi("1.0"));
    assert_eq!(bfi_of(&chain, &bob()), bfi("1.0"));
    assert_eq!(chain.ledger().pool_info(pid).unwrap().phase(), PoolPhase::Started);

    chain.mine_to(120);
    assert_eq!(chain.pending_reward(pid, &bob()).unwrap(), bfi("1.0"));

    let before = bfi_of(&chain, &bob());
    let withdrawn = chain.withdraw(bob(), pid, bfi("5")).unwrap();
    assert_eq!(withdrawn.amount, bfi("5"));
    assert_eq!(bfi_of(&chain, &bob()) - before, bfi("1.1"));
    assert_eq!(chain.balance_of(&busd, &bob()).unwrap(), bfi("995"));

    chain.mine(10);
    assert_eq!(chain.pending_reward(pid, &bob()).unwrap(), bfi("1.0"));

    let before = bfi_of(&chain, &bob());
    let rescued = chain.emergency_withdraw(bob(), pid).unwrap();
    assert_eq!(rescued.amount, bfi("5"));
    assert_eq!(bfi_of(&chain, &bob()), before);
    assert_eq!(chain.balance_of(&busd, &bob()).unwrap(), bfi("1000"));
    assert_eq!(chain.pending_reward(pid, &bob()).unwrap(), 0);
}

#[test]
fn test_weights_split_emission_between_pools() {
    let Setup { mut chain, busd } = setup(&[bob(), carol()]);
    let deployer = chain.deployer();
    let usdt = chain.create_token(deployer, "Tether", "USDT", 18).unwrap();
    chain.faucet(carol(), &usdt, bfi("1000")).unwrap();
    let ledger = chain.ledger().address();
    chain.approve(carol(), &usdt, &ledger, UNLIMITED_ALLOWANCE).unwrap();

    let busd_pool = chain.add_pool(deployer, 1000, busd, false, None).unwrap();
    let usdt_pool = chain.add_pool(deployer, 3000, usdt, false, None).unwrap();

    chain.mine_to(59);
    chain.deposit(bob(), busd_pool, bfi("10")).unwrap();
    chain.deposit(carol(), usdt_pool, bfi("10")).unwrap();

    // Both pools start in the same pass. The BUSD pool is settled first, while
    // it is still the only started pool, so it takes the full rate for 60..70.
    chain.mine_to(69);
    chain.mass_update_pools(deployer).unwrap();
    assert_eq!(chain.height(), 70);
    assert_eq!(chain.ledger().total_alloc_weight(), 4000);
    let bob_before = chain.pending_reward(busd_pool, &bob()).unwrap();
    let carol_before = chain.pending_reward(usdt_pool, &carol()).unwrap();
    assert_eq!(bob_before, bfi("1.0"));
    assert_eq!(carol_before, bfi("0.675"));

    // From here on 1:3 of 0.1 BFI per block.
    chain.mine_to(110);
    assert_eq!(chain.pending_reward(busd_pool, &bob()).unwrap() - bob_before, bfi("1.0"));
    assert_eq!(chain.pending_reward(usdt_pool, &carol()).unwrap() - carol_before, bfi("3.0"));
}

#[test]
fn test_reverted_deposit_consumes_no_block() {
    let Setup { mut chain, busd } = setup(&[bob()]);
    let deployer = chain.deployer();
    let pid = chain.add_pool(deployer, 1000, busd, false, None).unwrap();
    let height = chain.height();

    let err = chain.deposit(bob(), pid, bfi("5000")).unwrap_err();
    assert!(matches!(err, BearnError::InsufficientBalance { .. }));
    assert_eq!(chain.height(), height);
    assert_eq!(chain.ledger().pool_info(pid).unwrap().total_staked, 0);
    assert_eq!(chain.balance_of(&busd, &bob()).unwrap(), bfi("1000"));
}

#[test]
fn test_unknown_pool() {
    let Setup { mut chain, .. } = setup(&[bob()]);
    assert_eq!(chain.deposit(bob(), 7, 1).unwrap_err(), BearnError::InvalidPool(7));
    assert_eq!(chain.pending_reward(7, &bob()).unwrap_err(), BearnError::InvalidPool(7));
}

#[test]
fn test_reward_conserved_and_supply_capped() {
    let Setup { mut chain, busd } = setup(&[bob(), carol()]);
    let deployer = chain.deployer();
    let ledger = chain.ledger().address();
    let pid = chain.add_pool(deployer, 1000, busd, true, None).unwrap();

    chain.mine_to(60);
    chain.deposit(bob(), pid, bfi("3")).unwrap();
    chain.deposit(carol(), pid, bfi("7")).unwrap();
    chain.mine(17);
    chain.withdraw(bob(), pid, bfi("1")).unwrap();
    chain.mine(5);
    chain.deposit(carol(), pid, 0).unwrap();
    chain.set_emission_rate(deployer, bfi("0.3")).unwrap();
    chain.mine(11);
    chain.withdraw(bob(), pid, bfi("2")).unwrap();
    chain.withdraw(carol(), pid, bfi("7")).unwrap();

    let paid = bfi_of(&chain, &bob()) + bfi_of(&chain, &carol());
    let custody = bfi_of(&chain, &ledger);
    let supply = chain.reward_token().total_supply();
    // Everything minted either sits in custody or was paid out.
    assert_eq!(paid + custody, supply);
    // Only rounding dust beyond the initial prefund stays behind. Each accrual
    // strands at most total_staked / precision wei; fewer than ten calls accrue here.
    let max_dust = 10 * (bfi("10") / ACC_REWARD_PRECISION + 1);
    assert!(custody >= bfi("1000"));
    assert!(custody - bfi("1000") <= max_dust);
    assert!(supply <= chain.reward_token().cap());
    assert_eq!(chain.ledger().pool_info(pid).unwrap().total_staked, 0);
    assert!(supply > bfi("1000") + WEI_PER_BFI);
}
