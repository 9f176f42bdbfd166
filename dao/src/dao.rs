//! The assembled DAO: one clock, one audit trail, every public operation.

use crate::{DaoConfig, DaoError};
use hopestream_admission::{AdmissionGate, Decision};
use hopestream_credential::{CredentialLedger, VotingBreakdown};
use hopestream_governance::{
    GovernanceEngine, Proposal, ProposalAction, ProposalState, Timelock, TimelockRole,
};
use hopestream_types::{
    Address, Amount, AntiSybilParams, AuditLog, Clock, ProposalId, Timestamp, VoteSupport,
};
use hopestream_vault::{DonorInfo, Vault, VaultStats};
use serde::{Deserialize, Serialize};

/// Persisted DAO state. The audit trail is not part of it; it is an output
/// stream, exported separately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaoSnapshot {
    pub config: DaoConfig,
    pub taken_at: Timestamp,
    pub vault: Vault,
    pub governance: GovernanceEngine,
}

/// Vault + governance + timelock behind a single clock.
///
/// The timelock is the vault's governance identity and the governor holds the
/// proposer, executor and canceller roles on the timelock, so passed proposals
/// are the only governance path into the vault.
pub struct Dao<C: Clock> {
    clock: C,
    config: DaoConfig,
    vault: Vault,
    governance: GovernanceEngine,
    audit: AuditLog,
}

impl<C: Clock> Dao<C> {
    pub fn new(config: DaoConfig, clock: C) -> Result<Self, DaoError> {
        config.validate()?;
        let now = clock.now();

        let mut vault = Vault::new(
            config.vault,
            config.admin,
            config.beneficiary,
            config.anti_sybil,
            AdmissionGate::new(config.curve),
        )?;
        vault.set_governance(config.admin, config.timelock)?;
        if let Some(relayer) = config.relayer {
            vault.set_relayer(config.admin, relayer)?;
        }

        let mut timelock = Timelock::new(
            config.timelock,
            config.governance.timelock_min_delay_secs,
            config.admin,
        );
        for role in [
            TimelockRole::Proposer,
            TimelockRole::Executor,
            TimelockRole::Canceller,
        ] {
            timelock.grant_role(config.admin, role, config.governor)?;
        }
        let governance =
            GovernanceEngine::new(config.governor, config.vault, config.governance, timelock)?;

        tracing::info!(
            vault = %config.vault,
            timelock = %config.timelock,
            governor = %config.governor,
            beneficiary = %config.beneficiary,
            "dao initialised"
        );
        let mut dao = Self {
            clock,
            config,
            vault,
            governance,
            audit: AuditLog::new(),
        };
        dao.collect(now);
        Ok(dao)
    }

    /// Move every buffered component event into the audit trail.
    fn collect(&mut self, now: Timestamp) {
        self.audit.extend(now, self.vault.drain_events());
        self.audit.extend(now, self.governance.drain_events());
    }

    /// Run `op` at the current time and record whatever it emitted.
    fn run<T>(
        &mut self,
        op: impl FnOnce(&mut Self, Timestamp) -> Result<T, DaoError>,
    ) -> Result<T, DaoError> {
        let now = self.clock.now();
        let result = op(self, now);
        self.collect(now);
        result
    }

    // ── Donations ────────────────────────────────────────────────────────

    pub fn donate(&mut self, donor: Address, value: Amount) -> Result<Decision, DaoError> {
        self.run(|dao, now| Ok(dao.vault.receive(donor, value, now)?))
    }

    pub fn donate_from_dao(&mut self, caller: Address, value: Amount) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.donate_from_dao(caller, value)?))
    }

    /// Send value from `from` to the timelock for use in emergency calls.
    pub fn fund_timelock(&mut self, from: Address, amount: Amount) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.governance.timelock_mut().deposit(from, amount)?))
    }

    // ── Vault administration ─────────────────────────────────────────────

    pub fn add_milestone(
        &mut self,
        caller: Address,
        amount: Amount,
        release_time: Option<Timestamp>,
    ) -> Result<usize, DaoError> {
        self.run(|dao, now| Ok(dao.vault.add_milestone(caller, amount, release_time, now)?))
    }

    pub fn release_funds(&mut self, caller: Address) -> Result<Vec<usize>, DaoError> {
        self.run(|dao, now| Ok(dao.vault.release_funds(caller, now)?))
    }

    pub fn set_beneficiary(&mut self, caller: Address, new: Address) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.set_beneficiary(caller, new)?))
    }

    pub fn set_relayer(&mut self, caller: Address, new: Address) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.set_relayer(caller, new)?))
    }

    pub fn set_governance(&mut self, caller: Address, new: Address) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.set_governance(caller, new)?))
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.pause(caller)?))
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.unpause(caller)?))
    }

    pub fn update_anti_sybil_parameters(
        &mut self,
        caller: Address,
        params: AntiSybilParams,
    ) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.update_anti_sybil_parameters(caller, params)?))
    }

    // ── Voting weight ────────────────────────────────────────────────────

    pub fn delegate(&mut self, from: Address, to: Address) -> Result<(), DaoError> {
        self.run(|dao, now| Ok(dao.vault.delegate(from, to, now)?))
    }

    // ── Soulbound guards ─────────────────────────────────────────────────

    pub fn transfer_credential(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        id: u64,
    ) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.transfer_from(caller, from, to, id)?))
    }

    pub fn approve_credential(
        &mut self,
        caller: Address,
        to: Address,
        id: u64,
    ) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.approve(caller, to, id)?))
    }

    pub fn set_credential_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), DaoError> {
        self.run(|dao, _| Ok(dao.vault.set_approval_for_all(caller, operator, approved)?))
    }

    // ── Governance ───────────────────────────────────────────────────────

    pub fn propose(
        &mut self,
        proposer: Address,
        action: ProposalAction,
        description: &str,
    ) -> Result<ProposalId, DaoError> {
        self.run(|dao, now| {
            Ok(dao
                .governance
                .propose(dao.vault.ledger(), proposer, action, description, now)?)
        })
    }

    pub fn cast_vote(
        &mut self,
        voter: Address,
        id: ProposalId,
        support: VoteSupport,
    ) -> Result<Amount, DaoError> {
        self.run(|dao, now| {
            Ok(dao
                .governance
                .cast_vote(dao.vault.ledger(), voter, id, support, now)?)
        })
    }

    pub fn queue(&mut self, id: ProposalId) -> Result<Timestamp, DaoError> {
        self.run(|dao, now| Ok(dao.governance.queue(id, now)?))
    }

    pub fn execute(&mut self, id: ProposalId) -> Result<(), DaoError> {
        self.run(|dao, now| Ok(dao.governance.execute(id, &mut dao.vault, now)?))
    }

    pub fn cancel(&mut self, id: ProposalId, caller: Address) -> Result<(), DaoError> {
        self.run(|dao, now| Ok(dao.governance.cancel(id, caller, now)?))
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn ledger(&self) -> &CredentialLedger {
        self.vault.ledger()
    }

    pub fn governance(&self) -> &GovernanceEngine {
        &self.governance
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn donor_info(&self, addr: &Address) -> DonorInfo {
        self.vault.donor_info(addr)
    }

    pub fn stats(&self) -> VaultStats {
        self.vault.stats()
    }

    pub fn anti_sybil_parameters(&self) -> AntiSybilParams {
        self.vault.anti_sybil_parameters()
    }

    pub fn voting_power(&self, addr: &Address) -> Amount {
        self.governance.voting_power(self.vault.ledger(), addr)
    }

    pub fn voting_breakdown(&self, addr: &Address) -> VotingBreakdown {
        self.vault.ledger().voting_breakdown(addr)
    }

    pub fn quorum(&self, at: Timestamp) -> Amount {
        self.governance.quorum(self.vault.ledger(), at)
    }

    pub fn state(&self, id: &ProposalId) -> Result<ProposalState, DaoError> {
        Ok(self.governance.state(id, self.clock.now())?)
    }

    pub fn proposal(&self, id: &ProposalId) -> Result<&Proposal, DaoError> {
        Ok(self.governance.proposal(id)?)
    }

    /// `(against, for, abstain)`.
    pub fn proposal_votes(&self, id: &ProposalId) -> Result<(Amount, Amount, Amount), DaoError> {
        Ok(self.governance.proposal_votes(id)?)
    }

    // ── Persistence ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> DaoSnapshot {
        DaoSnapshot {
            config: self.config.clone(),
            taken_at: self.clock.now(),
            vault: self.vault.clone(),
            governance: self.governance.clone(),
        }
    }

    /// Full state as bincode.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, DaoError> {
        bincode::serialize(&self.snapshot()).map_err(|e| DaoError::Snapshot(e.to_string()))
    }

    /// Rebuild a DAO from a snapshot. The audit trail starts empty.
    pub fn restore(snapshot: DaoSnapshot, clock: C) -> Result<Self, DaoError> {
        snapshot.config.validate()?;
        if clock.now() < snapshot.taken_at {
            return Err(DaoError::Snapshot(format!(
                "clock reads {} but the snapshot was taken at {}",
                clock.now(),
                snapshot.taken_at
            )));
        }
        tracing::info!(taken_at = %snapshot.taken_at, "dao restored from snapshot");
        Ok(Self {
            clock,
            config: snapshot.config,
            vault: snapshot.vault,
            governance: snapshot.governance,
            audit: AuditLog::new(),
        })
    }

    pub fn restore_bytes(bytes: &[u8], clock: C) -> Result<Self, DaoError> {
        let snapshot: DaoSnapshot =
            bincode::deserialize(bytes).map_err(|e| DaoError::Snapshot(e.to_string()))?;
        Self::restore(snapshot, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopestream_nullables::NullClock;
    use hopestream_types::{Event, GovernanceParams};

    fn test_address(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn dao(clock: &NullClock) -> Dao<&NullClock> {
        let config = DaoConfig {
            governance: GovernanceParams::fast(),
            ..DaoConfig::default()
        };
        Dao::new(config, clock).unwrap()
    }

    #[test]
    fn wiring_makes_timelock_the_governance_identity() {
        let clock = NullClock::new(1_000);
        let dao = dao(&clock);
        let config = dao.config().clone();
        assert_eq!(dao.stats().governance, Some(config.timelock));
        let timelock = dao.governance().timelock();
        assert!(timelock.has_role(TimelockRole::Proposer, &config.governor));
        assert!(timelock.has_role(TimelockRole::Executor, &config.governor));
        assert!(!timelock.has_role(TimelockRole::Proposer, &config.admin));
        assert_eq!(
            dao.audit().last(),
            Some(&Event::GovernanceChanged {
                old: Address::ZERO,
                new: config.timelock,
            })
        );
    }

    #[test]
    fn audit_trail_is_stamped_with_clock_time() {
        let clock = NullClock::new(1_000);
        let mut dao = dao(&clock);
        let start = dao.audit().len() as u64;
        let donor = test_address(10);

        dao.donate(donor, Amount::milliether(100)).unwrap();
        clock.advance(5);
        dao.donate(donor, Amount::milliether(100)).unwrap();

        let records = dao.audit().since(start);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].at, Timestamp::new(1_000));
        assert!(matches!(records[1].event, Event::CredentialMinted { .. }));
        assert_eq!(records[3].at, Timestamp::new(1_005));
        assert_eq!(records[3].event, Event::DonationInCooldown { donor });
        assert!(records.windows(2).all(|w| w[0].seq + 1 == w[1].seq));
    }

    #[test]
    fn failed_operation_records_nothing() {
        let clock = NullClock::new(1_000);
        let mut dao = dao(&clock);
        let before = dao.audit().len();
        let err = dao.pause(test_address(66)).unwrap_err();
        assert_eq!(err.code(), "Unauthorized");
        assert_eq!(dao.donate(test_address(9), Amount::ZERO).unwrap_err().code(), "ZeroValue");
        assert_eq!(dao.audit().len(), before);
    }

    #[test]
    fn snapshot_restores_state() {
        let clock = NullClock::new(1_000);
        let mut dao = dao(&clock);
        let donor = test_address(10);
        dao.donate(donor, Amount::ether(1)).unwrap();
        dao.delegate(donor, donor).unwrap();
        let id = dao.propose(donor, ProposalAction::Pause, "pause").unwrap();

        let bytes = dao.snapshot_bytes().unwrap();
        let later = NullClock::new(1_000 + 60);
        let restored = Dao::restore_bytes(&bytes, &later).unwrap();
        assert_eq!(restored.voting_power(&donor), Amount::ether(1));
        assert_eq!(restored.stats(), dao.stats());
        assert_eq!(restored.state(&id).unwrap(), ProposalState::Active);
        assert!(restored.audit().is_empty());

        let earlier = NullClock::new(10);
        assert_eq!(
            Dao::restore_bytes(&bytes, &earlier).err().map(|e| e.code()),
            Some("Snapshot")
        );
        assert_eq!(
            Dao::restore_bytes(&bytes[..8], &later).err().map(|e| e.code()),
            Some("Snapshot")
        );
    }
}
