//! Core governance engine: proposals through creation, voting, queueing and
//! execution via the timelock.

use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalAction, ProposalState, ProposalVotes, Receipt};
use crate::timelock::{CallTarget, Timelock};
use hopestream_credential::CredentialLedger;
use hopestream_crypto::{description_hash, proposal_id};
use hopestream_types::{
    Address, Amount, Event, GovernanceParams, ProposalActionType, ProposalId, Timestamp,
    VoteSupport,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owns every proposal and the timelock they execute through.
///
/// Voting weight is read from the credential ledger at each proposal's
/// snapshot version, so donations and delegations made after creation never
/// change an open vote.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceEngine {
    address: Address,
    target: Address,
    params: GovernanceParams,
    proposals: HashMap<ProposalId, Proposal>,
    order: Vec<ProposalId>,
    timelock: Timelock,
    #[serde(skip)]
    events: Vec<Event>,
}

impl GovernanceEngine {
    /// `address` is the governor's own identity (it must hold the proposer and
    /// executor roles on `timelock`); `target` is the vault all calls go to.
    pub fn new(
        address: Address,
        target: Address,
        params: GovernanceParams,
        timelock: Timelock,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        if address.is_zero() {
            return Err(GovernanceError::InvalidAddress("governor"));
        }
        if target.is_zero() {
            return Err(GovernanceError::InvalidAddress("target"));
        }
        Ok(Self {
            address,
            target,
            params,
            proposals: HashMap::new(),
            order: Vec::new(),
            timelock,
            events: Vec::new(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Submit a proposal. Payload and proposer threshold are checked now,
    /// not at execution.
    pub fn propose(
        &mut self,
        ledger: &CredentialLedger,
        proposer: Address,
        action: ProposalAction,
        description: &str,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        action.validate(now)?;

        let have = ledger.votes(&proposer);
        let need = if action.is_anti_sybil_change() {
            self.params.anti_sybil_proposal_threshold
        } else {
            self.params.proposal_threshold
        };
        if have < need {
            tracing::warn!(proposer = %proposer, have = %have, need = %need, "proposer below threshold");
            return Err(GovernanceError::InsufficientProposerVotes { have, need });
        }

        let calls = action.calls(self.target);
        let encoded =
            bincode::serialize(&calls).map_err(|e| GovernanceError::Encoding(e.to_string()))?;
        let id = proposal_id(&encoded, description);
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::ProposalAlreadyExists(id));
        }

        let snapshot_version = ledger.version();
        let quorum = self
            .params
            .quorum_for(ledger.total_supply_at_version(snapshot_version));
        let vote_start = now.plus(self.params.voting_delay_secs);
        let vote_end = vote_start.plus(self.params.voting_period_secs);
        let action_type = action.action_type();

        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                action,
                calls,
                description: description.to_string(),
                snapshot_version,
                created_at: now,
                vote_start,
                vote_end,
                quorum,
                votes: ProposalVotes::default(),
                receipts: HashMap::new(),
                eta: None,
                operation: None,
                executed: false,
                canceled: false,
            },
        );
        self.order.push(id);

        tracing::info!(
            id = %id,
            proposer = %proposer,
            action = ?action_type,
            vote_start = %vote_start,
            vote_end = %vote_end,
            quorum = %quorum,
            "proposal created"
        );
        self.events.push(Event::ProposalCreated {
            id,
            proposer,
            action_type,
            vote_start,
            vote_end,
            description: description.to_string(),
        });
        Ok(id)
    }

    /// Record `voter`'s ballot with their weight at the proposal snapshot.
    pub fn cast_vote(
        &mut self,
        ledger: &CredentialLedger,
        voter: Address,
        id: ProposalId,
        support: VoteSupport,
        now: Timestamp,
    ) -> Result<Amount, GovernanceError> {
        let grace = self.params.grace_period_secs;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let state = proposal.state(now, grace);
        if state != ProposalState::Active {
            return Err(GovernanceError::VotingNotActive(state));
        }
        if proposal.receipts.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted(voter));
        }

        let weight = ledger.votes_at_version(&voter, proposal.snapshot_version);
        proposal.votes.add(support, weight);
        proposal.receipts.insert(voter, Receipt { support, weight });

        tracing::info!(id = %id, voter = %voter, support = ?support, weight = %weight, "vote cast");
        self.events.push(Event::VoteCast {
            voter,
            id,
            support,
            weight,
        });
        Ok(weight)
    }

    /// Schedule a succeeded proposal on the timelock. Anyone may call this.
    pub fn queue(&mut self, id: ProposalId, now: Timestamp) -> Result<Timestamp, GovernanceError> {
        let state = self.state(&id, now)?;
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::UnexpectedState {
                expected: ProposalState::Succeeded,
                actual: state,
            });
        }
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let delay = self.timelock.min_delay();
        let salt = description_hash(&proposal.description);
        let op = self.timelock.schedule(
            self.address,
            proposal.calls.clone(),
            None,
            salt,
            delay,
            now,
        )?;
        let eta = now.plus(delay);

        if let Some(p) = self.proposals.get_mut(&id) {
            p.eta = Some(eta);
            p.operation = Some(op);
        }
        tracing::info!(id = %id, op = %op, eta = %eta, "proposal queued");
        self.events.push(Event::ProposalQueued { id, eta });
        Ok(eta)
    }

    /// Run a queued proposal's calls through the timelock against `target`.
    ///
    /// If any call reverts the proposal stays `Queued` and may be retried.
    pub fn execute<T: CallTarget>(
        &mut self,
        id: ProposalId,
        target: &mut T,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let state = self.state(&id, now)?;
        if state != ProposalState::Queued {
            return Err(GovernanceError::UnexpectedState {
                expected: ProposalState::Queued,
                actual: state,
            });
        }
        let op = self
            .proposals
            .get(&id)
            .and_then(|p| p.operation)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if let Err(e) = self.timelock.execute(self.address, op, target, now) {
            tracing::warn!(id = %id, error = %e, "proposal execution failed");
            return Err(e.into());
        }
        if let Some(p) = self.proposals.get_mut(&id) {
            p.executed = true;
        }
        tracing::info!(id = %id, "proposal executed");
        self.events.push(Event::ProposalExecuted { id });
        Ok(())
    }

    /// Withdraw a proposal before voting starts. Proposer only.
    pub fn cancel(
        &mut self,
        id: ProposalId,
        caller: Address,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let state = self.state(&id, now)?;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if proposal.proposer != caller {
            return Err(GovernanceError::NotProposer);
        }
        if state != ProposalState::Pending {
            return Err(GovernanceError::UnexpectedState {
                expected: ProposalState::Pending,
                actual: state,
            });
        }
        proposal.canceled = true;
        tracing::info!(id = %id, "proposal canceled");
        self.events.push(Event::ProposalCanceled { id });
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn state(&self, id: &ProposalId, now: Timestamp) -> Result<ProposalState, GovernanceError> {
        self.proposal(id)
            .map(|p| p.state(now, self.params.grace_period_secs))
    }

    pub fn proposal(&self, id: &ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))
    }

    /// Proposals in creation order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.order.iter().filter_map(|id| self.proposals.get(id))
    }

    /// `(against, for, abstain)`.
    pub fn proposal_votes(&self, id: &ProposalId) -> Result<(Amount, Amount, Amount), GovernanceError> {
        self.proposal(id)
            .map(|p| (p.votes.against, p.votes.for_votes, p.votes.abstain))
    }

    pub fn proposal_action_type(&self, id: &ProposalId) -> Result<ProposalActionType, GovernanceError> {
        self.proposal(id).map(Proposal::action_type)
    }

    pub fn has_voted(&self, id: &ProposalId, voter: &Address) -> Result<bool, GovernanceError> {
        self.proposal(id).map(|p| p.receipts.contains_key(voter))
    }

    pub fn receipt(&self, id: &ProposalId, voter: &Address) -> Result<Option<Receipt>, GovernanceError> {
        self.proposal(id).map(|p| p.receipts.get(voter).copied())
    }

    /// Ledger version the proposal's weights and quorum are read at.
    pub fn proposal_snapshot(&self, id: &ProposalId) -> Result<u64, GovernanceError> {
        self.proposal(id).map(|p| p.snapshot_version)
    }

    /// Last second votes are accepted.
    pub fn proposal_deadline(&self, id: &ProposalId) -> Result<Timestamp, GovernanceError> {
        self.proposal(id).map(|p| p.vote_end)
    }

    pub fn proposal_eta(&self, id: &ProposalId) -> Result<Option<Timestamp>, GovernanceError> {
        self.proposal(id).map(|p| p.eta)
    }

    /// Current votable weight of `addr`.
    pub fn voting_power(&self, ledger: &CredentialLedger, addr: &Address) -> Amount {
        ledger.votes(addr)
    }

    /// Quorum for a proposal snapshotted at `at`.
    pub fn quorum(&self, ledger: &CredentialLedger, at: Timestamp) -> Amount {
        self.params.quorum_for(ledger.total_supply_at_time(at))
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn timelock(&self) -> &Timelock {
        &self.timelock
    }

    pub fn timelock_mut(&mut self) -> &mut Timelock {
        &mut self.timelock
    }

    /// Governance events followed by timelock events since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.events);
        events.extend(self.timelock.drain_events());
        events
    }
}
