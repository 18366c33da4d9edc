// crates/bearn-core/src/error.rs

use thiserror::Error;

/// Protocol-wide error types for the Bearn incentive engine.
///
/// Every error aborts the call that produced it. Engines validate before they
/// mutate, and the host rolls back anything an external collaborator changed,
/// so a returned error always means "no state was changed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BearnError {
    /// Caller lacks the governance, minter, or owner capability.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A mint would push total supply above the cap.
    #[error("Cap exceeded: requested {requested} but only {available} mintable")]
    CapExceeded { requested: u128, available: u128 },

    /// Scheduled fund release attempted before the cooldown window closed.
    #[error("Cooldown not elapsed: {remaining_secs}s remaining")]
    CooldownNotElapsed { remaining_secs: u64 },

    /// Burn, transfer, or withdraw beyond the caller's balance or stake.
    #[error("Insufficient balance: requested {requested} but only {available} available")]
    InsufficientBalance { requested: u128, available: u128 },

    /// `transfer_from` beyond the approved allowance.
    #[error("Insufficient allowance: requested {requested} but only {approved} approved")]
    InsufficientAllowance { requested: u128, approved: u128 },

    /// Pool index does not exist.
    #[error("Invalid pool: {0}")]
    InvalidPool(usize),

    /// Deposit token handed to the ledger does not belong to the addressed pool.
    #[error("Token mismatch: {0}")]
    TokenMismatch(String),

    /// A pool for this deposit token is already registered.
    #[error("Duplicate pool: {0}")]
    DuplicatePool(String),

    /// Checked arithmetic on an amount overflowed.
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Invalid state transition or parameter.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BearnError {
    fn from(e: serde_json::Error) -> Self {
        BearnError::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for BearnError {
    fn from(e: hex::FromHexError) -> Self {
        BearnError::Serialization(format!("Invalid hex: {}", e))
    }
}
