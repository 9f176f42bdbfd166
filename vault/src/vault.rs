//! Vault state and operations.

use crate::call::VaultCall;
use crate::error::VaultError;
use crate::milestone::Milestone;
use crate::roles::{Roles, ADMIN_OR_GOVERNANCE, RELEASERS};
use hopestream_admission::{AdmissionGate, Decision};
use hopestream_credential::CredentialLedger;
use hopestream_types::{
    Address, Amount, AntiSybilParams, Event, Timestamp, MILESTONE_MATURATION_SECS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-donor view combining ledger state with the admission policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorInfo {
    pub credential_count: u32,
    pub total_donated: Amount,
    pub last_donation: Option<Timestamp>,
    pub next_allowed_time: Option<Timestamp>,
    pub next_required_amount: Amount,
}

/// Vault-wide summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    pub beneficiary: Address,
    pub governance: Option<Address>,
    pub relayer: Option<Address>,
    pub total_donated: Amount,
    pub total_released: Amount,
    pub milestone_count: usize,
    pub paused: bool,
    pub balance: Amount,
}

/// The donation vault.
///
/// Exclusively owns the fund balance, the milestone list and the credential
/// ledger. Every public mutator either applies completely or returns an error
/// with no state change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    roles: Roles,
    beneficiary: Address,
    paused: bool,
    params: AntiSybilParams,
    gate: AdmissionGate,
    ledger: CredentialLedger,
    milestones: Vec<Milestone>,
    total_donated: Amount,
    total_released: Amount,
    balance: Amount,
    disbursed: HashMap<Address, Amount>,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Vault {
    pub fn new(
        address: Address,
        admin: Address,
        beneficiary: Address,
        params: AntiSybilParams,
        gate: AdmissionGate,
    ) -> Result<Self, VaultError> {
        if address.is_zero() {
            return Err(VaultError::InvalidAddress("vault"));
        }
        if admin.is_zero() {
            return Err(VaultError::InvalidAddress("admin"));
        }
        if beneficiary.is_zero() {
            return Err(VaultError::InvalidAddress("beneficiary"));
        }
        params.validate()?;
        Ok(Self {
            address,
            roles: Roles::new(admin),
            beneficiary,
            paused: false,
            params,
            gate,
            ledger: CredentialLedger::new(),
            milestones: Vec::new(),
            total_donated: Amount::ZERO,
            total_released: Amount::ZERO,
            balance: Amount::ZERO,
            disbursed: HashMap::new(),
            events: Vec::new(),
        })
    }

    // ── Donations ────────────────────────────────────────────────────────

    /// Accept a donation from anyone.
    ///
    /// The value is always kept once accepted; the returned `Decision` says
    /// whether it also earned a credential.
    pub fn receive(
        &mut self,
        donor: Address,
        value: Amount,
        now: Timestamp,
    ) -> Result<Decision, VaultError> {
        if self.paused {
            return Err(VaultError::EnforcedPause);
        }
        if donor.is_zero() {
            return Err(VaultError::InvalidAddress("donor"));
        }
        let record = self.ledger.donor_record(&donor);
        let decision = self.gate.evaluate(&record, value, &self.params, now)?;
        let total_donated = self
            .total_donated
            .checked_add(value)
            .ok_or(VaultError::Overflow)?;
        let balance = self.balance.checked_add(value).ok_or(VaultError::Overflow)?;

        if let Decision::Mint(amount) = decision {
            self.ledger
                .mint(donor, amount, self.params.max_credentials_per_address, now)?;
        }
        self.ledger.record_donation(donor, value)?;
        self.total_donated = total_donated;
        self.balance = balance;

        self.events.push(Event::DonationReceived { donor, amount: value });
        self.pull_ledger_events();
        match decision {
            Decision::Mint(_) => {}
            Decision::BelowThreshold { required } => {
                tracing::debug!(donor = %donor, value = %value, required = %required, "donation below threshold");
                self.events.push(Event::DonationBelowThreshold {
                    donor,
                    amount: value,
                    required,
                });
            }
            Decision::MaxReached => {
                tracing::debug!(donor = %donor, value = %value, "donor at credential cap");
                self.events.push(Event::MaxNFTsReached { donor });
            }
            Decision::InCooldown { next_allowed } => {
                tracing::debug!(donor = %donor, value = %value, next_allowed = %next_allowed, "donation in cooldown");
                self.events.push(Event::DonationInCooldown { donor });
            }
        }
        Ok(decision)
    }

    /// Trusted DAO self-funding. Skips the admission gate.
    pub fn donate_from_dao(&mut self, caller: Address, value: Amount) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "donate_from_dao")?;
        if value.is_zero() {
            return Err(VaultError::ZeroValue);
        }
        let total_donated = self
            .total_donated
            .checked_add(value)
            .ok_or(VaultError::Overflow)?;
        let balance = self.balance.checked_add(value).ok_or(VaultError::Overflow)?;
        self.total_donated = total_donated;
        self.balance = balance;
        tracing::info!(from = %caller, value = %value, "dao donation");
        self.events.push(Event::DonationReceived {
            donor: caller,
            amount: value,
        });
        Ok(())
    }

    // ── Milestones ───────────────────────────────────────────────────────

    /// Schedule a payout. Without an explicit time it matures
    /// `MILESTONE_MATURATION_SECS` from now.
    pub fn add_milestone(
        &mut self,
        caller: Address,
        amount: Amount,
        release_time: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<usize, VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "add_milestone")?;
        if amount.is_zero() {
            return Err(VaultError::InvalidAmount);
        }
        let release_time = match release_time {
            Some(t) if t <= now => return Err(VaultError::InvalidTime),
            Some(t) => t,
            None => now.plus(MILESTONE_MATURATION_SECS),
        };
        self.milestones.push(Milestone::new(amount, release_time));
        let index = self.milestones.len() - 1;
        tracing::info!(index, amount = %amount, release_time = %release_time, "milestone added");
        self.events.push(Event::MilestoneAdded {
            amount,
            release_time,
        });
        Ok(index)
    }

    /// Pay out every due milestone, oldest first, while the balance covers it.
    ///
    /// Scanning stops at the first milestone that is not yet due. If the first
    /// due milestone cannot be covered the call fails; a later uncovered one
    /// just ends the scan. Returns the indices released.
    pub fn release_funds(
        &mut self,
        caller: Address,
        now: Timestamp,
    ) -> Result<Vec<usize>, VaultError> {
        self.roles.require(&caller, RELEASERS, "release_funds")?;
        if self.paused {
            return Err(VaultError::EnforcedPause);
        }

        let mut remaining = self.balance;
        let mut due = Vec::new();
        for (index, m) in self.milestones.iter().enumerate() {
            if m.released {
                continue;
            }
            if m.release_time > now {
                break;
            }
            if m.amount > remaining {
                if due.is_empty() {
                    return Err(VaultError::InsufficientBalance {
                        needed: m.amount,
                        available: remaining,
                    });
                }
                break;
            }
            remaining = remaining - m.amount;
            due.push(index);
        }

        for &index in &due {
            let milestone = &mut self.milestones[index];
            milestone.released = true;
            let amount = milestone.amount;
            self.balance = self.balance.saturating_sub(amount);
            self.total_released = self.total_released.saturating_add(amount);
            let paid = self.disbursed.entry(self.beneficiary).or_default();
            *paid = paid.saturating_add(amount);
            tracing::info!(index, amount = %amount, beneficiary = %self.beneficiary, "milestone released");
            self.events.push(Event::MilestoneReleased {
                index,
                amount,
                timestamp: now,
            });
        }
        Ok(due)
    }

    // ── Administration ───────────────────────────────────────────────────

    pub fn set_beneficiary(&mut self, caller: Address, new: Address) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "set_beneficiary")?;
        if new.is_zero() {
            return Err(VaultError::InvalidAddress("beneficiary"));
        }
        let old = std::mem::replace(&mut self.beneficiary, new);
        tracing::info!(old = %old, new = %new, "beneficiary changed");
        self.events.push(Event::BeneficiaryChanged { old, new });
        Ok(())
    }

    pub fn set_governance(&mut self, caller: Address, new: Address) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "set_governance")?;
        if new.is_zero() {
            return Err(VaultError::InvalidAddress("governance"));
        }
        let old = self.roles.governance.replace(new).unwrap_or(Address::ZERO);
        tracing::info!(old = %old, new = %new, "governance changed");
        self.events.push(Event::GovernanceChanged { old, new });
        Ok(())
    }

    pub fn set_relayer(&mut self, caller: Address, new: Address) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "set_relayer")?;
        if new.is_zero() {
            return Err(VaultError::InvalidAddress("relayer"));
        }
        let old = self.roles.relayer.replace(new).unwrap_or(Address::ZERO);
        tracing::info!(old = %old, new = %new, "relayer changed");
        self.events.push(Event::RelayerChanged { old, new });
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "pause")?;
        if self.paused {
            return Err(VaultError::EnforcedPause);
        }
        self.paused = true;
        tracing::info!(by = %caller, "vault paused");
        self.events.push(Event::Paused { by: caller });
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), VaultError> {
        self.roles.require(&caller, ADMIN_OR_GOVERNANCE, "unpause")?;
        if !self.paused {
            return Err(VaultError::ExpectedPause);
        }
        self.paused = false;
        tracing::info!(by = %caller, "vault unpaused");
        self.events.push(Event::Unpaused { by: caller });
        Ok(())
    }

    pub fn update_anti_sybil_parameters(
        &mut self,
        caller: Address,
        params: AntiSybilParams,
    ) -> Result<(), VaultError> {
        self.roles
            .require(&caller, ADMIN_OR_GOVERNANCE, "update_anti_sybil_parameters")?;
        params.validate()?;
        self.params = params;
        tracing::info!(
            min = %params.minimum_donation_for_credential,
            max = params.max_credentials_per_address,
            cooldown = params.donation_cooldown_secs,
            "anti-sybil parameters updated"
        );
        self.events.push(Event::AntiSybilParametersUpdated {
            min: params.minimum_donation_for_credential,
            max: params.max_credentials_per_address,
            cooldown: params.donation_cooldown_secs,
        });
        Ok(())
    }

    /// Apply one privileged call carrying `value`.
    pub fn dispatch(
        &mut self,
        caller: Address,
        value: Amount,
        call: &VaultCall,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.roles.require(&caller, call.allowed_roles(), call.name())?;
        if !call.check_value(value) {
            return Err(VaultError::ValueNotAccepted {
                operation: call.name(),
            });
        }
        match call {
            VaultCall::SetBeneficiary(addr) => self.set_beneficiary(caller, *addr),
            VaultCall::Pause => self.pause(caller),
            VaultCall::Unpause => self.unpause(caller),
            VaultCall::AddMilestone {
                amount,
                release_time,
            } => self
                .add_milestone(caller, *amount, *release_time, now)
                .map(|_| ()),
            VaultCall::SetRelayer(addr) => self.set_relayer(caller, *addr),
            VaultCall::SetGovernance(addr) => self.set_governance(caller, *addr),
            VaultCall::UpdateAntiSybilParameters(params) => {
                self.update_anti_sybil_parameters(caller, *params)
            }
            VaultCall::DonateFromDao => self.donate_from_dao(caller, value),
            VaultCall::ReleaseFunds => self.release_funds(caller, now).map(|_| ()),
        }
    }

    // ── Delegation passthrough ───────────────────────────────────────────

    /// Delegate `from`'s voting weight. Credential events join the vault's trail.
    pub fn delegate(
        &mut self,
        from: Address,
        to: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.ledger.delegate(from, to, now)?;
        self.pull_ledger_events();
        Ok(())
    }

    // ── Soulbound guards ─────────────────────────────────────────────────

    /// Credentials never move. Always `SoulboundViolation`.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        id: u64,
    ) -> Result<(), VaultError> {
        tracing::warn!(caller = %caller, id, "credential transfer rejected");
        Ok(self.ledger.transfer_from(caller, from, to, id)?)
    }

    pub fn approve(&mut self, caller: Address, to: Address, id: u64) -> Result<(), VaultError> {
        tracing::warn!(caller = %caller, id, "credential approval rejected");
        Ok(self.ledger.approve(caller, to, id)?)
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), VaultError> {
        tracing::warn!(caller = %caller, operator = %operator, "operator approval rejected");
        Ok(self.ledger.set_approval_for_all(caller, operator, approved)?)
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn anti_sybil_parameters(&self) -> AntiSybilParams {
        self.params
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn ledger(&self) -> &CredentialLedger {
        &self.ledger
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_donated(&self) -> Amount {
        self.total_donated
    }

    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// Total paid out to `addr` as beneficiary.
    pub fn disbursed_to(&self, addr: &Address) -> Amount {
        self.disbursed.get(addr).copied().unwrap_or(Amount::ZERO)
    }

    pub fn milestone(&self, index: usize) -> Result<&Milestone, VaultError> {
        self.milestones
            .get(index)
            .ok_or(VaultError::MilestoneNotFound(index))
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn donor_info(&self, addr: &Address) -> DonorInfo {
        let record = self.ledger.donor_record(addr);
        DonorInfo {
            credential_count: record.credential_count,
            total_donated: record.total_donated,
            last_donation: record.last_donation,
            next_allowed_time: self.gate.next_allowed_time(&record, &self.params),
            next_required_amount: self.gate.required_amount(&record, &self.params),
        }
    }

    pub fn stats(&self) -> VaultStats {
        VaultStats {
            beneficiary: self.beneficiary,
            governance: self.roles.governance,
            relayer: self.roles.relayer,
            total_donated: self.total_donated,
            total_released: self.total_released,
            milestone_count: self.milestones.len(),
            paused: self.paused,
            balance: self.balance,
        }
    }

    // ── Events ───────────────────────────────────────────────────────────

    /// Take the vault's and the ledger's events in emission order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.pull_ledger_events();
        std::mem::take(&mut self.events)
    }

    fn pull_ledger_events(&mut self) {
        let ledger_events = self.ledger.drain_events();
        self.events.extend(ledger_events);
    }
}
