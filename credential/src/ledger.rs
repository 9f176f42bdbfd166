//! The credential ledger: issuance, delegation and voting weight.

use crate::checkpoint::CheckpointHistory;
use crate::credential::{Credential, DonorRecord, VotingBreakdown};
use crate::error::CredentialError;
use hopestream_types::{Address, Amount, Event, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owns every credential and donor record.
///
/// Weight is maintained as a running total per owner, so `weight_of` is O(1).
/// Votable weight lives in per-delegatee checkpoint histories and only counts
/// once the owner has chosen a delegatee.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CredentialLedger {
    credentials: Vec<Credential>,
    owned: HashMap<Address, Vec<u64>>,
    donors: HashMap<Address, DonorRecord>,
    delegates: HashMap<Address, Address>,
    checkpoints: HashMap<Address, CheckpointHistory>,
    total_supply: CheckpointHistory,
    version: u64,
    #[serde(skip)]
    events: Vec<Event>,
}

impl CredentialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Issuance ─────────────────────────────────────────────────────────

    /// Mint a credential for `owner` worth `donation_amount` of voting weight.
    ///
    /// Fails with `CapacityError` if the owner already holds `cap` credentials.
    /// Sets the owner's `last_donation` to `now`.
    pub fn mint(
        &mut self,
        owner: Address,
        donation_amount: Amount,
        cap: u32,
        now: Timestamp,
    ) -> Result<u64, CredentialError> {
        if owner.is_zero() {
            return Err(CredentialError::InvalidAddress);
        }
        let record = self.donors.get(&owner).cloned().unwrap_or_default();
        if record.credential_count >= cap {
            return Err(CredentialError::CapacityError {
                owner,
                held: record.credential_count,
                cap,
            });
        }
        let new_weight = record
            .weight
            .checked_add(donation_amount)
            .ok_or(CredentialError::Overflow)?;
        let new_supply = self
            .total_supply
            .latest()
            .checked_add(donation_amount)
            .ok_or(CredentialError::Overflow)?;
        let delegatee = self.delegates.get(&owner).copied();
        let delegatee_votes = match delegatee {
            Some(to) => Some(
                self.votes(&to)
                    .checked_add(donation_amount)
                    .ok_or(CredentialError::Overflow)?,
            ),
            None => None,
        };

        // All checks passed; apply.
        let id = self.credentials.len() as u64;
        self.credentials.push(Credential {
            id,
            owner,
            donation_amount,
            minted_at: now,
        });
        self.owned.entry(owner).or_default().push(id);

        let entry = self.donors.entry(owner).or_default();
        entry.credential_count += 1;
        entry.weight = new_weight;
        entry.last_donation = Some(now);
        let count = entry.credential_count;

        self.version += 1;
        self.total_supply.push(self.version, now, new_supply);
        if let (Some(to), Some(votes)) = (delegatee, delegatee_votes) {
            self.write_checkpoint(to, now, votes);
        }

        tracing::info!(
            owner = %owner,
            id,
            amount = %donation_amount,
            count,
            "credential minted"
        );
        self.events.push(Event::CredentialMinted {
            owner,
            id,
            amount: donation_amount,
        });
        Ok(id)
    }

    /// Count a recognised donation towards the donor's lifetime total,
    /// whether or not it mints.
    pub fn record_donation(&mut self, donor: Address, value: Amount) -> Result<(), CredentialError> {
        let record = self.donors.entry(donor).or_default();
        record.total_donated = record
            .total_donated
            .checked_add(value)
            .ok_or(CredentialError::Overflow)?;
        Ok(())
    }

    // ── Delegation ───────────────────────────────────────────────────────

    /// Route `from`'s weight to `to` for all future snapshots.
    ///
    /// Delegating to oneself activates one's own votes.
    pub fn delegate(
        &mut self,
        from: Address,
        to: Address,
        now: Timestamp,
    ) -> Result<(), CredentialError> {
        if from.is_zero() || to.is_zero() {
            return Err(CredentialError::InvalidAddress);
        }
        let previous = self.delegates.insert(from, to);
        let weight = self.weight_of(&from);

        if previous != Some(to) && !weight.is_zero() {
            self.version += 1;
            if let Some(old) = previous {
                let reduced = self.votes(&old).saturating_sub(weight);
                self.write_checkpoint(old, now, reduced);
            }
            let raised = self.votes(&to).saturating_add(weight);
            self.write_checkpoint(to, now, raised);
        }

        tracing::info!(delegator = %from, to = %to, weight = %weight, "delegate changed");
        self.events.push(Event::DelegateChanged {
            delegator: from,
            from: previous,
            to,
        });
        Ok(())
    }

    /// Current delegatee of `addr`, if any.
    pub fn delegates(&self, addr: &Address) -> Option<Address> {
        self.delegates.get(addr).copied()
    }

    // ── Votes ────────────────────────────────────────────────────────────

    /// Votable weight currently attributed to `addr` through delegation.
    pub fn votes(&self, addr: &Address) -> Amount {
        self.checkpoints
            .get(addr)
            .map(CheckpointHistory::latest)
            .unwrap_or(Amount::ZERO)
    }

    pub fn votes_at_version(&self, addr: &Address, version: u64) -> Amount {
        self.checkpoints
            .get(addr)
            .map(|h| h.at_version(version))
            .unwrap_or(Amount::ZERO)
    }

    pub fn votes_at_time(&self, addr: &Address, at: Timestamp) -> Amount {
        self.checkpoints
            .get(addr)
            .map(|h| h.at_time(at))
            .unwrap_or(Amount::ZERO)
    }

    /// Sum of all minted weight, delegated or not.
    pub fn total_supply(&self) -> Amount {
        self.total_supply.latest()
    }

    pub fn total_supply_at_version(&self, version: u64) -> Amount {
        self.total_supply.at_version(version)
    }

    pub fn total_supply_at_time(&self, at: Timestamp) -> Amount {
        self.total_supply.at_time(at)
    }

    /// Ledger sequence number, bumped by every weight-affecting mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    // ── Views ────────────────────────────────────────────────────────────

    /// Weight from `addr`'s own credentials, regardless of delegation.
    pub fn weight_of(&self, addr: &Address) -> Amount {
        self.donors
            .get(addr)
            .map(|r| r.weight)
            .unwrap_or(Amount::ZERO)
    }

    /// Number of credentials held by `addr`.
    pub fn balance_of(&self, addr: &Address) -> u32 {
        self.donors
            .get(addr)
            .map(|r| r.credential_count)
            .unwrap_or(0)
    }

    pub fn donor_record(&self, addr: &Address) -> DonorRecord {
        self.donors.get(addr).cloned().unwrap_or_default()
    }

    pub fn owner_of(&self, id: u64) -> Result<Address, CredentialError> {
        self.credential(id).map(|c| c.owner)
    }

    pub fn credential(&self, id: u64) -> Result<&Credential, CredentialError> {
        self.credentials
            .get(id as usize)
            .ok_or(CredentialError::NotFound(id))
    }

    pub fn credentials_of(&self, addr: &Address) -> Vec<&Credential> {
        self.owned
            .get(addr)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.credentials.get(*id as usize))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn next_credential_id(&self) -> u64 {
        self.credentials.len() as u64
    }

    pub fn voting_breakdown(&self, addr: &Address) -> VotingBreakdown {
        let record = self.donor_record(addr);
        VotingBreakdown {
            credential_count: record.credential_count,
            total_donation: record.weight,
            voting_power: record.weight,
            average_donation_per_credential: record.average_donation(),
        }
    }

    // ── Soulbound guards ─────────────────────────────────────────────────

    /// Credentials never move. Always fails.
    pub fn transfer_from(
        &mut self,
        _caller: Address,
        _from: Address,
        _to: Address,
        _id: u64,
    ) -> Result<(), CredentialError> {
        Err(CredentialError::SoulboundViolation)
    }

    /// Credentials cannot be approved for transfer. Always fails.
    pub fn approve(&mut self, _caller: Address, _to: Address, _id: u64) -> Result<(), CredentialError> {
        Err(CredentialError::SoulboundViolation)
    }

    /// Operators cannot be approved. Always fails.
    pub fn set_approval_for_all(
        &mut self,
        _caller: Address,
        _operator: Address,
        _approved: bool,
    ) -> Result<(), CredentialError> {
        Err(CredentialError::SoulboundViolation)
    }

    // ── Events ───────────────────────────────────────────────────────────

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn write_checkpoint(&mut self, addr: Address, at: Timestamp, votes: Amount) {
        self.checkpoints
            .entry(addr)
            .or_default()
            .push(self.version, at, votes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn mint_assigns_sequential_ids_from_zero() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        let b = test_address(2);
        assert_eq!(ledger.mint(a, Amount::ether(1), 15, t(10)).unwrap(), 0);
        assert_eq!(ledger.mint(b, Amount::ether(3), 15, t(11)).unwrap(), 1);
        assert_eq!(ledger.next_credential_id(), 2);
        assert_eq!(ledger.owner_of(0).unwrap(), a);
        assert_eq!(ledger.owner_of(1).unwrap(), b);
        assert_eq!(ledger.credential(1).unwrap().donation_amount, Amount::ether(3));
        assert_eq!(ledger.owner_of(2), Err(CredentialError::NotFound(2)));
    }

    #[test]
    fn weight_is_sum_of_amounts_not_count() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();
        ledger.mint(a, Amount::ether(2), 15, t(1)).unwrap();
        assert_eq!(ledger.weight_of(&a), Amount::ether(3));
        assert_eq!(ledger.balance_of(&a), 2);
        assert_eq!(ledger.total_supply(), Amount::ether(3));

        let breakdown = ledger.voting_breakdown(&a);
        assert_eq!(breakdown.credential_count, 2);
        assert_eq!(breakdown.total_donation, Amount::ether(3));
        assert_eq!(breakdown.voting_power, Amount::ether(3));
        assert_eq!(breakdown.average_donation_per_credential, Amount::milliether(1500));
    }

    #[test]
    fn zero_amount_credential_carries_no_weight() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ZERO, 15, t(0)).unwrap();
        assert_eq!(ledger.balance_of(&a), 1);
        assert_eq!(ledger.weight_of(&a), Amount::ZERO);
    }

    #[test]
    fn mint_respects_cap() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 2, t(0)).unwrap();
        ledger.mint(a, Amount::ether(1), 2, t(1)).unwrap();
        match ledger.mint(a, Amount::ether(1), 2, t(2)).unwrap_err() {
            CredentialError::CapacityError { held, cap, .. } => {
                assert_eq!(held, 2);
                assert_eq!(cap, 2);
            }
            other => panic!("expected CapacityError, got {other:?}"),
        }
        assert_eq!(ledger.balance_of(&a), 2);
        assert_eq!(ledger.weight_of(&a), Amount::ether(2));
    }

    #[test]
    fn mint_to_zero_address_fails() {
        let mut ledger = CredentialLedger::new();
        assert_eq!(
            ledger.mint(Address::ZERO, Amount::ether(1), 15, t(0)),
            Err(CredentialError::InvalidAddress)
        );
    }

    #[test]
    fn votes_require_delegation() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();
        assert_eq!(ledger.votes(&a), Amount::ZERO);

        ledger.delegate(a, a, t(1)).unwrap();
        assert_eq!(ledger.votes(&a), Amount::ether(1));

        // Later mints flow to the delegatee automatically.
        ledger.mint(a, Amount::ether(2), 15, t(2)).unwrap();
        assert_eq!(ledger.votes(&a), Amount::ether(3));
    }

    #[test]
    fn redelegation_moves_weight() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        let b = test_address(2);
        let c = test_address(3);
        ledger.mint(a, Amount::ether(2), 15, t(0)).unwrap();
        ledger.delegate(a, b, t(1)).unwrap();
        assert_eq!(ledger.votes(&b), Amount::ether(2));
        assert_eq!(ledger.delegates(&a), Some(b));

        ledger.delegate(a, c, t(2)).unwrap();
        assert_eq!(ledger.votes(&b), Amount::ZERO);
        assert_eq!(ledger.votes(&c), Amount::ether(2));
        assert_eq!(ledger.weight_of(&a), Amount::ether(2));
    }

    #[test]
    fn delegating_twice_to_same_target_is_idempotent() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();
        ledger.delegate(a, a, t(1)).unwrap();
        let version = ledger.version();
        ledger.delegate(a, a, t(2)).unwrap();
        assert_eq!(ledger.votes(&a), Amount::ether(1));
        assert_eq!(ledger.version(), version);
    }

    #[test]
    fn historical_votes_by_version_and_time() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 15, t(100)).unwrap();
        ledger.delegate(a, a, t(200)).unwrap();
        let snapshot = ledger.version();
        ledger.mint(a, Amount::ether(4), 15, t(300)).unwrap();

        assert_eq!(ledger.votes_at_version(&a, snapshot), Amount::ether(1));
        assert_eq!(ledger.votes(&a), Amount::ether(5));
        assert_eq!(ledger.total_supply_at_version(snapshot), Amount::ether(1));
        assert_eq!(ledger.total_supply(), Amount::ether(5));

        assert_eq!(ledger.votes_at_time(&a, t(150)), Amount::ZERO);
        assert_eq!(ledger.votes_at_time(&a, t(250)), Amount::ether(1));
        assert_eq!(ledger.total_supply_at_time(t(150)), Amount::ether(1));
        assert_eq!(ledger.total_supply_at_time(t(99)), Amount::ZERO);
    }

    #[test]
    fn record_donation_accumulates_without_minting() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.record_donation(a, Amount::milliether(5)).unwrap();
        ledger.record_donation(a, Amount::milliether(5)).unwrap();
        let record = ledger.donor_record(&a);
        assert_eq!(record.total_donated, Amount::milliether(10));
        assert_eq!(record.credential_count, 0);
        assert_eq!(record.last_donation, None);
        assert_eq!(ledger.weight_of(&a), Amount::ZERO);
    }

    #[test]
    fn soulbound_guards_always_fail() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        let b = test_address(2);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();

        assert_eq!(
            ledger.transfer_from(a, a, b, 0),
            Err(CredentialError::SoulboundViolation)
        );
        assert_eq!(ledger.approve(a, b, 0), Err(CredentialError::SoulboundViolation));
        assert_eq!(
            ledger.set_approval_for_all(a, b, true),
            Err(CredentialError::SoulboundViolation)
        );
        assert_eq!(ledger.owner_of(0).unwrap(), a);
        assert_eq!(
            CredentialError::SoulboundViolation.to_string(),
            "Soulbound: non-transferable"
        );
    }

    #[test]
    fn events_are_buffered_until_drained() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();
        ledger.delegate(a, a, t(0)).unwrap();
        let events = ledger.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Event::CredentialMinted { owner: a, id: 0, amount: Amount::ether(1) }
        );
        assert_eq!(
            events[1],
            Event::DelegateChanged { delegator: a, from: None, to: a }
        );
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn credentials_of_lists_owned() {
        let mut ledger = CredentialLedger::new();
        let a = test_address(1);
        let b = test_address(2);
        ledger.mint(a, Amount::ether(1), 15, t(0)).unwrap();
        ledger.mint(b, Amount::ether(1), 15, t(0)).unwrap();
        ledger.mint(a, Amount::ether(2), 15, t(0)).unwrap();
        let ids: Vec<u64> = ledger.credentials_of(&a).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert!(ledger.credentials_of(&test_address(9)).is_empty());
    }
}
