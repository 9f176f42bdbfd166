//! Credential and per-donor aggregate records.

use hopestream_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// One minted voting unit. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Sequential id, starting at 0.
    pub id: u64,
    /// Exclusive, permanent owner.
    pub owner: Address,
    /// Value attributed to this credential at mint time (may be zero).
    pub donation_amount: Amount,
    pub minted_at: Timestamp,
}

/// Admission and weight aggregates for one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRecord {
    /// Number of credentials owned. Never exceeds the configured cap.
    pub credential_count: u32,
    /// Every donation the vault recognised from this address, minted or not.
    pub total_donated: Amount,
    /// Time of the most recent admitted (minting) donation.
    pub last_donation: Option<Timestamp>,
    /// Running sum of `donation_amount` over owned credentials.
    pub weight: Amount,
}

impl DonorRecord {
    /// Mean donation per credential, zero when none are held.
    pub fn average_donation(&self) -> Amount {
        match self.credential_count {
            0 => Amount::ZERO,
            n => Amount::new(self.weight.wei() / n as u128),
        }
    }
}

/// Summary of how an address's voting weight is made up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingBreakdown {
    pub credential_count: u32,
    pub total_donation: Amount,
    pub voting_power: Amount,
    pub average_donation_per_credential: Amount,
}
