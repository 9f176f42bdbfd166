//! Governance proposals and their lifecycle.

use crate::error::GovernanceError;
use crate::timelock::Call;
use hopestream_types::{
    Address, Amount, AntiSybilParams, OperationId, ProposalActionType, ProposalId, Timestamp,
    VoteSupport,
};
use hopestream_vault::VaultCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle state, derived from the proposal record and the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created; voting has not started.
    Pending,
    /// Inside the voting window.
    Active,
    /// Cancelled by its proposer before voting started.
    Canceled,
    /// Voting closed without quorum or without a for-majority.
    Defeated,
    /// Voting closed with quorum and for > against.
    Succeeded,
    /// Scheduled on the timelock.
    Queued,
    /// Queued but not executed within the grace period.
    Expired,
    /// Calls applied.
    Executed,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a proposal asks the vault to do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    ChangeBeneficiary(Address),
    Pause,
    Unpause,
    AddMilestone {
        amount: Amount,
        release_time: Option<Timestamp>,
    },
    ChangeRelayer(Address),
    UpdateAntiSybilParams(AntiSybilParams),
    /// Arbitrary vault calls, each with its own value.
    EmergencyAction(Vec<(Amount, VaultCall)>),
}

impl ProposalAction {
    pub fn action_type(&self) -> ProposalActionType {
        match self {
            Self::ChangeBeneficiary(_) => ProposalActionType::ChangeBeneficiary,
            Self::Pause => ProposalActionType::Pause,
            Self::Unpause => ProposalActionType::Unpause,
            Self::AddMilestone { .. } => ProposalActionType::AddMilestone,
            Self::ChangeRelayer(_) => ProposalActionType::ChangeRelayer,
            Self::UpdateAntiSybilParams(_) => ProposalActionType::UpdateAntiSybilParams,
            Self::EmergencyAction(_) => ProposalActionType::EmergencyAction,
        }
    }

    /// Whether the stricter proposer threshold applies.
    pub fn is_anti_sybil_change(&self) -> bool {
        matches!(self, Self::UpdateAntiSybilParams(_))
    }

    /// Reject payloads that would only fail later at execution.
    pub fn validate(&self, now: Timestamp) -> Result<(), GovernanceError> {
        match self {
            Self::ChangeBeneficiary(addr) if addr.is_zero() => {
                Err(GovernanceError::InvalidAddress("beneficiary"))
            }
            Self::ChangeRelayer(addr) if addr.is_zero() => {
                Err(GovernanceError::InvalidAddress("relayer"))
            }
            Self::AddMilestone { amount, .. } if amount.is_zero() => {
                Err(GovernanceError::InvalidAmount)
            }
            Self::AddMilestone {
                release_time: Some(t),
                ..
            } if *t <= now => Err(GovernanceError::InvalidTime),
            Self::UpdateAntiSybilParams(params) => Ok(params.validate()?),
            Self::EmergencyAction(calls) if calls.is_empty() => Err(GovernanceError::EmptyProposal),
            Self::EmergencyAction(calls) => {
                for (value, call) in calls {
                    if !call.check_value(*value) {
                        return Err(GovernanceError::InvalidAmount);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The timelock calls this action expands to.
    pub fn calls(&self, target: Address) -> Vec<Call> {
        let single = |data: VaultCall| vec![Call::new(target, data)];
        match self {
            Self::ChangeBeneficiary(addr) => single(VaultCall::SetBeneficiary(*addr)),
            Self::Pause => single(VaultCall::Pause),
            Self::Unpause => single(VaultCall::Unpause),
            Self::AddMilestone {
                amount,
                release_time,
            } => single(VaultCall::AddMilestone {
                amount: *amount,
                release_time: *release_time,
            }),
            Self::ChangeRelayer(addr) => single(VaultCall::SetRelayer(*addr)),
            Self::UpdateAntiSybilParams(params) => {
                single(VaultCall::UpdateAntiSybilParameters(*params))
            }
            Self::EmergencyAction(calls) => calls
                .iter()
                .map(|(value, data)| Call::new(target, data.clone()).with_value(*value))
                .collect(),
        }
    }
}

/// Tally of a proposal's votes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVotes {
    pub against: Amount,
    pub for_votes: Amount,
    pub abstain: Amount,
}

impl ProposalVotes {
    /// Everything that counts towards quorum, abstentions included.
    pub fn participation(&self) -> Amount {
        self.against
            .saturating_add(self.for_votes)
            .saturating_add(self.abstain)
    }

    pub fn add(&mut self, support: VoteSupport, weight: Amount) {
        let slot = match support {
            VoteSupport::Against => &mut self.against,
            VoteSupport::For => &mut self.for_votes,
            VoteSupport::Abstain => &mut self.abstain,
        };
        *slot = slot.saturating_add(weight);
    }
}

/// How one address voted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub support: VoteSupport,
    pub weight: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub action: ProposalAction,
    pub calls: Vec<Call>,
    pub description: String,
    /// Ledger version whose weights and supply this proposal is decided on.
    pub snapshot_version: u64,
    pub created_at: Timestamp,
    pub vote_start: Timestamp,
    pub vote_end: Timestamp,
    /// Quorum fixed from the snapshot supply at creation.
    pub quorum: Amount,
    pub votes: ProposalVotes,
    pub receipts: HashMap<Address, Receipt>,
    pub eta: Option<Timestamp>,
    pub operation: Option<OperationId>,
    pub executed: bool,
    pub canceled: bool,
}

impl Proposal {
    pub fn action_type(&self) -> ProposalActionType {
        self.action.action_type()
    }

    /// Quorum met and strictly more for than against.
    pub fn passed(&self) -> bool {
        self.votes.participation() >= self.quorum && self.votes.for_votes > self.votes.against
    }

    pub fn state(&self, now: Timestamp, grace_period_secs: u64) -> ProposalState {
        if self.executed {
            return ProposalState::Executed;
        }
        if self.canceled {
            return ProposalState::Canceled;
        }
        if now < self.vote_start {
            return ProposalState::Pending;
        }
        if now <= self.vote_end {
            return ProposalState::Active;
        }
        if let Some(eta) = self.eta {
            return if eta.has_expired(grace_period_secs, now) {
                ProposalState::Expired
            } else {
                ProposalState::Queued
            };
        }
        if self.passed() {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn sample(quorum: Amount) -> Proposal {
        Proposal {
            id: ProposalId::new([1; 32]),
            proposer: Address::repeat_byte(1),
            action: ProposalAction::Pause,
            calls: ProposalAction::Pause.calls(Address::repeat_byte(99)),
            description: "pause".into(),
            snapshot_version: 0,
            created_at: t(0),
            vote_start: t(10),
            vote_end: t(20),
            quorum,
            votes: ProposalVotes::default(),
            receipts: HashMap::new(),
            eta: None,
            operation: None,
            executed: false,
            canceled: false,
        }
    }

    #[test]
    fn state_follows_clock() {
        let mut p = sample(Amount::new(10));
        assert_eq!(p.state(t(9), 100), ProposalState::Pending);
        assert_eq!(p.state(t(10), 100), ProposalState::Active);
        assert_eq!(p.state(t(20), 100), ProposalState::Active);
        assert_eq!(p.state(t(21), 100), ProposalState::Defeated);

        p.votes.add(VoteSupport::For, Amount::new(10));
        assert_eq!(p.state(t(21), 100), ProposalState::Succeeded);

        p.eta = Some(t(30));
        assert_eq!(p.state(t(129), 100), ProposalState::Queued);
        assert_eq!(p.state(t(130), 100), ProposalState::Expired);

        p.executed = true;
        assert_eq!(p.state(t(130), 100), ProposalState::Executed);
    }

    #[test]
    fn abstain_counts_for_quorum_only() {
        let mut p = sample(Amount::new(10));
        p.votes.add(VoteSupport::For, Amount::new(3));
        p.votes.add(VoteSupport::Abstain, Amount::new(7));
        assert!(p.passed());

        let mut tie = sample(Amount::new(10));
        tie.votes.add(VoteSupport::For, Amount::new(5));
        tie.votes.add(VoteSupport::Against, Amount::new(5));
        tie.votes.add(VoteSupport::Abstain, Amount::new(50));
        assert!(!tie.passed());
    }

    #[test]
    fn validation_rejects_bad_payloads() {
        let now = t(100);
        assert_eq!(
            ProposalAction::ChangeBeneficiary(Address::ZERO).validate(now),
            Err(GovernanceError::InvalidAddress("beneficiary"))
        );
        assert_eq!(
            ProposalAction::ChangeRelayer(Address::ZERO).validate(now),
            Err(GovernanceError::InvalidAddress("relayer"))
        );
        assert_eq!(
            ProposalAction::AddMilestone { amount: Amount::ZERO, release_time: None }.validate(now),
            Err(GovernanceError::InvalidAmount)
        );
        assert_eq!(
            ProposalAction::AddMilestone { amount: Amount::ether(1), release_time: Some(t(100)) }
                .validate(now),
            Err(GovernanceError::InvalidTime)
        );
        let bad = AntiSybilParams::new(Amount::milliether(10), 0, 3600);
        assert_eq!(
            ProposalAction::UpdateAntiSybilParams(bad).validate(now).unwrap_err().code(),
            "ParameterOutOfRange"
        );
        let long = AntiSybilParams::new(Amount::milliether(10), 10, 86_401);
        assert_eq!(
            ProposalAction::UpdateAntiSybilParams(long).validate(now).unwrap_err().to_string(),
            "Cooldown too long: 86401s > 86400s"
        );
        assert_eq!(
            ProposalAction::EmergencyAction(vec![]).validate(now),
            Err(GovernanceError::EmptyProposal)
        );
        assert_eq!(
            ProposalAction::EmergencyAction(vec![(Amount::new(1), VaultCall::Pause)]).validate(now),
            Err(GovernanceError::InvalidAmount)
        );
        assert!(ProposalAction::Pause.validate(now).is_ok());
    }

    #[test]
    fn actions_expand_to_calls() {
        let target = Address::repeat_byte(99);
        let calls = ProposalAction::ChangeRelayer(Address::repeat_byte(4)).calls(target);
        assert_eq!(calls, vec![Call::new(target, VaultCall::SetRelayer(Address::repeat_byte(4)))]);

        let emergency = ProposalAction::EmergencyAction(vec![
            (Amount::ZERO, VaultCall::Pause),
            (Amount::ether(1), VaultCall::DonateFromDao),
        ]);
        let calls = emergency.calls(target);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].value, Amount::ether(1));
        assert_eq!(emergency.action_type(), ProposalActionType::EmergencyAction);
        assert_eq!(emergency.action_type() as u8, 6);
    }
}
