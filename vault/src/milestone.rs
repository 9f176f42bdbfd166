use hopestream_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// A scheduled payout to the beneficiary.
///
/// Immutable once created except for the `released` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub amount: Amount,
    pub release_time: Timestamp,
    pub released: bool,
}

impl Milestone {
    pub fn new(amount: Amount, release_time: Timestamp) -> Self {
        Self {
            amount,
            release_time,
            released: false,
        }
    }

    /// Unreleased and due at `now`.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        !self.released && self.release_time <= now
    }
}
