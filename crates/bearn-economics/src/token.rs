// crates/bearn-economics/src/token.rs
//
// BFI token units and amount type.
//
// The smallest unit of BFI is the "wei". 1 BFI = 10^18 wei. All internal
// accounting uses wei as u128 to avoid floating-point precision issues in
// economic calculations. Human-facing amounts (config files, CLI output) go
// through `Bfi::parse` and `Display`, which are exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use bearn_core::error::BearnError;

/// Decimal places of BFI and of the default deposit tokens.
pub const DECIMALS: u32 = 18;

/// Number of wei in one BFI. 1 BFI = 10^18 wei.
pub const WEI_PER_BFI: u128 = 1_000_000_000_000_000_000;

/// A BFI amount.
///
/// Wraps an amount in wei (the smallest denomination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Bfi {
    /// Amount in wei (1 BFI = 10^18 wei).
    pub wei: u128,
}

impl Bfi {
    /// Create an amount from a whole number of BFI.
    ///
    /// # Example
    /// ```
    /// use bearn_economics::token::Bfi;
    /// assert_eq!(Bfi::from_whole(210_000).wei, 210_000 * 1_000_000_000_000_000_000);
    /// ```
    pub fn from_whole(whole: u64) -> Self {
        Self {
            wei: whole as u128 * WEI_PER_BFI,
        }
    }

    /// Create an amount from a wei value.
    pub fn from_wei(wei: u128) -> Self {
        Self { wei }
    }

    /// Parse a decimal BFI string such as `"10"`, `"0.1"` or `"1_000.25"`.
    ///
    /// Parsing is exact: more than 18 fractional digits is an error rather
    /// than a silent truncation.
    pub fn parse(s: &str) -> Result<Self, BearnError> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() {
            return Err(BearnError::Config("empty amount".to_string()));
        }

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        if frac.len() > DECIMALS as usize {
            return Err(BearnError::Config(format!(
                "amount {} has more than {} decimal places",
                s, DECIMALS
            )));
        }

        let parse_digits = |digits: &str| -> Result<u128, BearnError> {
            if digits.is_empty() {
                return Ok(0);
            }
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(BearnError::Config(format!("invalid amount: {}", s)));
            }
            digits
                .parse::<u128>()
                .map_err(|e| BearnError::Config(format!("invalid amount {}: {}", s, e)))
        };

        let whole_wei = parse_digits(whole)?
            .checked_mul(WEI_PER_BFI)
            .ok_or_else(|| BearnError::ArithmeticOverflow(format!("amount {} too large", s)))?;
        let frac_padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
        let frac_wei = parse_digits(&frac_padded)?;

        let wei = whole_wei
            .checked_add(frac_wei)
            .ok_or_else(|| BearnError::ArithmeticOverflow(format!("amount {} too large", s)))?;
        Ok(Self { wei })
    }

    /// Returns zero BFI.
    pub fn zero() -> Self {
        Self { wei: 0 }
    }
}

impl Add for Bfi {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_add(rhs.wei),
        }
    }
}

impl Sub for Bfi {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_sub(rhs.wei),
        }
    }
}

impl fmt::Display for Bfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.wei / WEI_PER_BFI;
        let frac = self.wei % WEI_PER_BFI;
        if frac == 0 {
            write!(f, "{} BFI", whole)
        } else {
            // Up to 18 decimal places, trailing zeros trimmed
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{} BFI", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_per_bfi() {
        assert_eq!(WEI_PER_BFI, 10u128.pow(DECIMALS));
    }

    #[test]
    fn test_parse_whole() {
        assert_eq!(Bfi::parse("10").unwrap().wei, 10 * WEI_PER_BFI);
        assert_eq!(Bfi::parse("210_000").unwrap(), Bfi::from_whole(210_000));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(Bfi::parse("0.1").unwrap().wei, WEI_PER_BFI / 10);
        assert_eq!(Bfi::parse("1.1").unwrap().wei, 11 * WEI_PER_BFI / 10);
        assert_eq!(Bfi::parse(".5").unwrap().wei, WEI_PER_BFI / 2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Bfi::parse("").is_err());
        assert!(Bfi::parse("abc").is_err());
        assert!(Bfi::parse("-1").is_err());
        assert!(Bfi::parse("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_sub_saturating() {
        let a = Bfi::from_whole(1);
        let b = Bfi::from_whole(2);
        assert_eq!((a - b).wei, 0);
    }

    #[test]
    fn test_display_whole() {
        assert_eq!(format!("{}", Bfi::from_whole(42)), "42 BFI");
    }

    #[test]
    fn test_display_fractional() {
        assert_eq!(format!("{}", Bfi::parse("1.1").unwrap()), "1.1 BFI");
        assert_eq!(format!("{}", Bfi::from_wei(1)), "0.000000000000000001 BFI");
    }

    #[test]
    fn test_display_zero() {
        assert_eq!(format!("{}", Bfi::zero()), "0 BFI");
    }
}
