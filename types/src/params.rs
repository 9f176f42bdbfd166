//! Anti-Sybil and governance parameters.
//!
//! `AntiSybilParams` is the process-wide admission policy held by the vault and
//! changed only through its privileged update (directly by the admin or via a
//! governance proposal). `GovernanceParams` fixes the proposal lifecycle timings
//! and thresholds for a deployment.

use crate::amount::Amount;
use crate::time::ONE_DAY_SECS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound (inclusive) on the per-address credential cap.
pub const MAX_CREDENTIALS_CAP: u32 = 100;

/// Upper bound (inclusive) on the donation cooldown.
pub const MAX_COOLDOWN_SECS: u64 = ONE_DAY_SECS;

const BPS_DENOMINATOR: u64 = 10_000;

/// Reasons a parameter set is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Invalid minimum donation")]
    MinimumDonation,

    #[error("Invalid max NFTs: {0} not in 1..=100")]
    MaxCredentials(u32),

    #[error("Cooldown too long: {0}s > 86400s")]
    CooldownTooLong(u64),

    #[error("quorum {0} bps exceeds 10000")]
    Quorum(u32),

    #[error("voting period must be non-zero")]
    VotingPeriod,

    #[error("anti-Sybil proposal threshold must exceed the general proposal threshold")]
    SecondaryThreshold,
}

/// The admission policy consulted on every donation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiSybilParams {
    /// Base amount a donation must reach to mint a credential.
    pub minimum_donation_for_credential: Amount,
    /// Hard cap on credentials per address.
    pub max_credentials_per_address: u32,
    /// Minimum seconds between two admitted donations from one address.
    pub donation_cooldown_secs: u64,
}

impl AntiSybilParams {
    pub fn new(minimum: Amount, max_credentials: u32, cooldown_secs: u64) -> Self {
        Self {
            minimum_donation_for_credential: minimum,
            max_credentials_per_address: max_credentials,
            donation_cooldown_secs: cooldown_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.minimum_donation_for_credential.is_zero() {
            return Err(ParamError::MinimumDonation);
        }
        if !(1..=MAX_CREDENTIALS_CAP).contains(&self.max_credentials_per_address) {
            return Err(ParamError::MaxCredentials(self.max_credentials_per_address));
        }
        if self.donation_cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(ParamError::CooldownTooLong(self.donation_cooldown_secs));
        }
        Ok(())
    }
}

impl Default for AntiSybilParams {
    fn default() -> Self {
        Self {
            minimum_donation_for_credential: Amount::milliether(10), // 0.01 ETH
            max_credentials_per_address: 15,
            donation_cooldown_secs: 3600,
        }
    }
}

/// How the admission requirement grows with the number of credentials held.
///
/// `multiplier_bps(n)` is 1x while `n < base_tier`, then rises by `step_bps`
/// for every further credential: 1x, 1x, 1.5x, 2x, 2.5x, ... with the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveCurve {
    /// Number of credentials issued at the base requirement.
    pub base_tier: u32,
    /// Increase per credential beyond the base tier, in basis points.
    pub step_bps: u32,
}

impl ProgressiveCurve {
    /// A curve that never raises the requirement.
    pub const FLAT: Self = Self {
        base_tier: u32::MAX,
        step_bps: 0,
    };

    /// Requirement multiplier (basis points) for a donor already holding `held` credentials.
    pub fn multiplier_bps(&self, held: u32) -> u64 {
        if held < self.base_tier {
            return BPS_DENOMINATOR;
        }
        let steps = (held - self.base_tier) as u64 + 1;
        BPS_DENOMINATOR.saturating_add((self.step_bps as u64).saturating_mul(steps))
    }

    /// Amount required for the next credential. Never below `minimum`;
    /// saturates at `u128::MAX` wei.
    pub fn required(&self, minimum: Amount, held: u32) -> Amount {
        minimum
            .checked_mul_bps(self.multiplier_bps(held))
            .unwrap_or(Amount::new(u128::MAX))
    }
}

impl Default for ProgressiveCurve {
    fn default() -> Self {
        Self {
            base_tier: 2,
            step_bps: 5_000,
        }
    }
}

/// Lifecycle timings and thresholds for governance proposals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Seconds between proposal creation and the start of voting.
    pub voting_delay_secs: u64,
    /// Length of the voting window in seconds.
    pub voting_period_secs: u64,
    /// Votes a proposer needs to submit any proposal.
    pub proposal_threshold: Amount,
    /// Stricter threshold for proposals that change anti-Sybil parameters.
    pub anti_sybil_proposal_threshold: Amount,
    /// Quorum as a fraction of the snapshotted voting supply (basis points).
    pub quorum_bps: u32,
    /// Minimum delay between queueing and execution.
    pub timelock_min_delay_secs: u64,
    /// How long a queued proposal stays executable once ready.
    pub grace_period_secs: u64,
}

impl GovernanceParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.quorum_bps as u64 > BPS_DENOMINATOR {
            return Err(ParamError::Quorum(self.quorum_bps));
        }
        if self.voting_period_secs == 0 {
            return Err(ParamError::VotingPeriod);
        }
        if self.anti_sybil_proposal_threshold <= self.proposal_threshold {
            return Err(ParamError::SecondaryThreshold);
        }
        Ok(())
    }

    /// Quorum for a given voting supply.
    pub fn quorum_for(&self, supply: Amount) -> Amount {
        supply
            .checked_mul_bps(self.quorum_bps as u64)
            .unwrap_or(Amount::new(u128::MAX))
    }

    /// Short timelines for local replays and tests.
    pub fn fast() -> Self {
        Self {
            voting_delay_secs: 60,
            voting_period_secs: 600,
            timelock_min_delay_secs: 60,
            grace_period_secs: 3600,
            ..Self::default()
        }
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_delay_secs: ONE_DAY_SECS,
            voting_period_secs: 7 * ONE_DAY_SECS,
            proposal_threshold: Amount::milliether(100), // 0.1 ETH
            anti_sybil_proposal_threshold: Amount::ether(1),
            quorum_bps: 400, // 4%
            timelock_min_delay_secs: ONE_DAY_SECS,
            grace_period_secs: 14 * ONE_DAY_SECS,
        }
    }
}
