// crates/bearn-economics/src/treasury.rs
//
// Scheduled treasury releases for BFI.
//
// Governance may mint a release at most once every 72 hours. Each release
// amount is split by basis points across three fund wallets:
//   - Public fund:    5750 bps (57.5%)
//   - Community fund: 2000 bps (20.0%)
//   - Team fund:      1750 bps (17.5%)
//
// The remaining 5% of the cap is the game fund: a fixed 10,500 BFI reserve,
// released once and kept mintable by every scheduled release.

use serde::{Deserialize, Serialize};

use bearn_core::error::BearnError;
use bearn_core::identity::Address;

/// Basis-point denominator: 10,000 bps = 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Minimum spacing between two scheduled releases: 72 hours.
pub const FUND_RELEASE_COOLDOWN_SECS: u64 = 72 * 60 * 60;

/// Default public-fund share: 57.5%.
pub const PUBLIC_FUND_BPS: u16 = 5_750;

/// Default community-fund share: 20%.
pub const COMMUNITY_FUND_BPS: u16 = 2_000;

/// Default team-fund share: 17.5%.
pub const TEAM_FUND_BPS: u16 = 1_750;

/// Basis-point weights applied to each scheduled release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSplit {
    pub public_bps: u16,
    pub community_bps: u16,
    pub team_bps: u16,
}

impl FundSplit {
    /// Build a split, rejecting weights that sum past 100%.
    pub fn new(public_bps: u16, community_bps: u16, team_bps: u16) -> Result<Self, BearnError> {
        let split = Self {
            public_bps,
            community_bps,
            team_bps,
        };
        split.validate()?;
        Ok(split)
    }

    /// Reject weights that sum past 100%. The fields are public, so anything
    /// not built through `new` is checked here before use.
    pub fn validate(&self) -> Result<(), BearnError> {
        if self.total_bps() > BPS_DENOMINATOR {
            return Err(BearnError::Config(format!(
                "fund split sums to {} bps, above {}",
                self.total_bps(),
                BPS_DENOMINATOR
            )));
        }
        Ok(())
    }

    pub fn total_bps(&self) -> u128 {
        self.public_bps as u128 + self.community_bps as u128 + self.team_bps as u128
    }

    /// Apply the split to a release amount.
    ///
    /// Each share rounds down independently; the rounding remainder and the
    /// unallocated bps are never minted.
    pub fn apply(&self, amount: u128) -> Result<FundRelease, BearnError> {
        self.validate()?;
        let share = |bps: u16| -> Result<u128, BearnError> {
            amount
                .checked_mul(bps as u128)
                .map(|v| v / BPS_DENOMINATOR)
                .ok_or_else(|| BearnError::ArithmeticOverflow("fund release share".to_string()))
        };
        Ok(FundRelease {
            public: share(self.public_bps)?,
            community: share(self.community_bps)?,
            team: share(self.team_bps)?,
        })
    }
}

impl Default for FundSplit {
    fn default() -> Self {
        Self {
            public_bps: PUBLIC_FUND_BPS,
            community_bps: COMMUNITY_FUND_BPS,
            team_bps: TEAM_FUND_BPS,
        }
    }
}

/// Wallets that receive treasury mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundAddresses {
    pub public: Address,
    pub community: Address,
    pub team: Address,
    pub game: Address,
}

impl FundAddresses {
    pub fn validate(&self) -> Result<(), BearnError> {
        let all = [self.public, self.community, self.team, self.game];
        if all.iter().any(Address::is_zero) {
            return Err(BearnError::InvalidState(
                "fund address cannot be the zero address".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FundAddresses {
    fn default() -> Self {
        Self {
            public: Address::from_label("public-fund"),
            community: Address::from_label("community-fund"),
            team: Address::from_label("team-fund"),
            game: Address::from_label("game-fund"),
        }
    }
}

/// Amounts minted to each wallet by one scheduled release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRelease {
    pub public: u128,
    pub community: u128,
    pub team: u128,
}

impl FundRelease {
    pub fn total(&self) -> u128 {
        // Bounded by the release amount for any validated split.
        self.public
            .saturating_add(self.community)
            .saturating_add(self.team)
    }
}
