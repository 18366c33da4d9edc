// crates/bearn-core/src/identity.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::clock::TimeSource;
use crate::error::BearnError;

/// A principal on the host: a holder, the governance key, a minter, a fund
/// wallet, or a contract such as the reward ledger itself.
///
/// Addresses are opaque 32-byte values. Access control compares them for
/// equality; nothing in the engines interprets the bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address. Never a valid mint or transfer recipient.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Used by the host and the CLI to name principals ("deployer", "bob",
    /// "busd") without managing key material. The address is the SHA-256
    /// digest of the label.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Address(bytes)
    }

    /// Parse a hex address, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, BearnError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw)?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            BearnError::Serialization(format!("Address must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Address(bytes))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// First four bytes in hex, for log lines.
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl FromStr for Address {
    type Err = BearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Per-call execution context supplied by the host.
///
/// Mirrors what a chain runtime hands a contract: who is calling, and the
/// height and timestamp of the block the call executes in. Engines read time
/// only through this value, never from an ambient clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The principal invoking the operation.
    pub caller: Address,
    /// Current block height.
    pub height: u64,
    /// Current block timestamp in seconds.
    pub timestamp: u64,
}

impl CallContext {
    /// Build a context for `caller` at the time source's current block.
    pub fn new(caller: Address, time: &dyn TimeSource) -> Self {
        Self {
            caller,
            height: time.height(),
            timestamp: time.timestamp(),
        }
    }

    /// Same block, different caller. Used when a contract acts on its own behalf.
    pub fn as_caller(&self, caller: Address) -> Self {
        Self { caller, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_from_label_is_deterministic() {
        assert_eq!(Address::from_label("bob"), Address::from_label("bob"));
        assert_ne!(Address::from_label("bob"), Address::from_label("alice"));
        assert!(!Address::from_label("bob").is_zero());
    }

    #[test]
    fn test_hex_roundtrip_with_prefix() {
        let addr = Address::from_label("deployer");
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_from_hex_wrong_length() {
        let result = Address::from_hex("0xdeadbeef");
        assert!(matches!(result, Err(BearnError::Serialization(_))));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from_label("minter");
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_call_context_reads_time_source() {
        let clock = ManualClock::new(42, 1_000);
        let ctx = CallContext::new(Address::from_label("bob"), &clock);
        assert_eq!(ctx.height, 42);
        assert_eq!(ctx.timestamp, 1_000);

        let ledger = Address::from_label("ledger");
        let as_ledger = ctx.as_caller(ledger);
        assert_eq!(as_ledger.caller, ledger);
        assert_eq!(as_ledger.height, 42);
    }
}
