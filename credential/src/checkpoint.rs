//! Versioned weight history.
//!
//! Each weight-affecting mutation of the ledger bumps a global version and
//! appends `(version, at, votes)` to every history it touches. Lookups are a
//! binary search for the latest entry at or before the query point, so reading
//! a snapshot is O(log k) in the number of changes for that address.

use hopestream_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u64,
    pub at: Timestamp,
    pub votes: Amount,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointHistory {
    points: Vec<Checkpoint>,
}

impl CheckpointHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `votes` as of `version`. A second write at the same version
    /// replaces the first.
    pub fn push(&mut self, version: u64, at: Timestamp, votes: Amount) {
        if let Some(last) = self.points.last_mut() {
            if last.version == version {
                last.votes = votes;
                return;
            }
        }
        self.points.push(Checkpoint { version, at, votes });
    }

    pub fn latest(&self) -> Amount {
        self.points.last().map(|c| c.votes).unwrap_or(Amount::ZERO)
    }

    /// Votes after every mutation with version `<= version`.
    pub fn at_version(&self, version: u64) -> Amount {
        let idx = self.points.partition_point(|c| c.version <= version);
        self.value_before(idx)
    }

    /// Votes after every mutation that happened at or before `at`.
    pub fn at_time(&self, at: Timestamp) -> Amount {
        let idx = self.points.partition_point(|c| c.at <= at);
        self.value_before(idx)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn value_before(&self, idx: usize) -> Amount {
        match idx {
            0 => Amount::ZERO,
            i => self.points[i - 1].votes,
        }
    }
}
