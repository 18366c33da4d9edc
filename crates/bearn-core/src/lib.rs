// crates/bearn-core/src/lib.rs
//
// bearn-core: Core types, traits, and error taxonomy for the Bearn incentive engine.
//
// This is the leaf crate that the rest of the workspace depends on. It defines
// principal identities, the per-call execution context supplied by the host,
// the time source, the fungible-token interface consumed by the reward ledger,
// and the protocol-wide error type.

pub mod clock;
pub mod error;
pub mod identity;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use bearn_core::Address;`

// Identity types
pub use identity::{Address, CallContext};

// Time
pub use clock::{ManualClock, TimeSource};

// Error type
pub use error::BearnError;

// Traits
pub use traits::FungibleToken;
