//! Audit-trail events.
//!
//! Every state change in the vault, the credential ledger, governance and the
//! timelock is recorded as an `Event`. External tooling parses these, so the
//! variant names and field shapes are part of the public interface.

use crate::address::Address;
use crate::amount::Amount;
use crate::hash::{OperationId, ProposalId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Ballot choice. Discriminants match the wire encoding (Against=0, For=1, Abstain=2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl TryFrom<u8> for VoteSupport {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Against),
            1 => Ok(Self::For),
            2 => Ok(Self::Abstain),
            other => Err(other),
        }
    }
}

/// Kind of vault operation a proposal asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalActionType {
    ChangeBeneficiary = 0,
    Pause = 1,
    Unpause = 2,
    AddMilestone = 3,
    ChangeRelayer = 4,
    UpdateAntiSybilParams = 5,
    EmergencyAction = 6,
}

/// A single audit-trail entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    // ── Vault ────────────────────────────────────────────────────────────
    DonationReceived {
        donor: Address,
        amount: Amount,
    },
    DonationBelowThreshold {
        donor: Address,
        amount: Amount,
        required: Amount,
    },
    DonationInCooldown {
        donor: Address,
    },
    MaxNFTsReached {
        donor: Address,
    },
    MilestoneAdded {
        amount: Amount,
        release_time: Timestamp,
    },
    MilestoneReleased {
        index: usize,
        amount: Amount,
        timestamp: Timestamp,
    },
    BeneficiaryChanged {
        old: Address,
        new: Address,
    },
    GovernanceChanged {
        old: Address,
        new: Address,
    },
    RelayerChanged {
        old: Address,
        new: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    AntiSybilParametersUpdated {
        min: Amount,
        max: u32,
        cooldown: u64,
    },

    // ── Credential ledger ────────────────────────────────────────────────
    CredentialMinted {
        owner: Address,
        id: u64,
        amount: Amount,
    },
    DelegateChanged {
        delegator: Address,
        from: Option<Address>,
        to: Address,
    },

    // ── Governance ───────────────────────────────────────────────────────
    ProposalCreated {
        id: ProposalId,
        proposer: Address,
        action_type: ProposalActionType,
        vote_start: Timestamp,
        vote_end: Timestamp,
        description: String,
    },
    VoteCast {
        voter: Address,
        id: ProposalId,
        support: VoteSupport,
        weight: Amount,
    },
    ProposalQueued {
        id: ProposalId,
        eta: Timestamp,
    },
    ProposalExecuted {
        id: ProposalId,
    },
    ProposalCanceled {
        id: ProposalId,
    },

    // ── Timelock ─────────────────────────────────────────────────────────
    CallScheduled {
        op: OperationId,
        index: usize,
        target: Address,
        value: Amount,
        delay: u64,
    },
    CallExecuted {
        op: OperationId,
        index: usize,
        target: Address,
        value: Amount,
    },
    OperationCancelled {
        op: OperationId,
    },
    TimelockFunded {
        from: Address,
        amount: Amount,
    },
}

/// An event stamped with its position in the trail and the time it happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub seq: u64,
    pub at: Timestamp,
    #[serde(flatten)]
    pub event: Event,
}

/// Append-only ordered audit trail.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event; returns its sequence number.
    pub fn append(&mut self, at: Timestamp, event: Event) -> u64 {
        let seq = self.records.len() as u64;
        self.records.push(AuditRecord { seq, at, event });
        seq
    }

    /// Append a batch of events that all happened at `at`.
    pub fn extend(&mut self, at: Timestamp, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.append(at, event);
        }
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Records with `seq >= from`.
    pub fn since(&self, from: u64) -> &[AuditRecord] {
        let start = (from as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&Event> {
        self.records.last().map(|r| &r.event)
    }
}
