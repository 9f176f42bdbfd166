//! Execution timelock.
//!
//! Approved calls wait here for at least `min_delay` seconds before anyone
//! holding the executor role may run them. Access is a plain map from role to
//! the addresses holding it. Execution runs every call of an operation against
//! a staged copy of the target and commits only if all of them succeed, so a
//! reverted operation stays pending and can be retried.

use crate::error::TimelockError;
use hopestream_crypto::operation_id;
use hopestream_types::{Address, Amount, Event, OperationId, Timestamp};
use hopestream_vault::{Vault, VaultCall, VaultError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One call of an operation: send `value` to `target` and apply `data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub value: Amount,
    pub data: VaultCall,
}

impl Call {
    pub fn new(target: Address, data: VaultCall) -> Self {
        Self {
            target,
            value: Amount::ZERO,
            data,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Anything the timelock can execute calls against.
///
/// `Clone` is what makes staged, all-or-nothing execution possible.
pub trait CallTarget: Clone {
    fn target_address(&self) -> Address;

    fn apply(
        &mut self,
        caller: Address,
        value: Amount,
        call: &VaultCall,
        now: Timestamp,
    ) -> Result<(), VaultError>;
}

impl CallTarget for Vault {
    fn target_address(&self) -> Address {
        self.address()
    }

    fn apply(
        &mut self,
        caller: Address,
        value: Amount,
        call: &VaultCall,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.dispatch(caller, value, call, now)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimelockRole {
    Proposer,
    Executor,
    Canceller,
    Admin,
}

/// A scheduled batch of calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub calls: Vec<Call>,
    pub predecessor: Option<OperationId>,
    pub salt: [u8; 32],
    pub delay: u64,
    pub ready_at: Timestamp,
    pub executed: bool,
}

impl Operation {
    pub fn total_value(&self) -> Option<Amount> {
        self.calls
            .iter()
            .try_fold(Amount::ZERO, |acc, c| acc.checked_add(c.value))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Timelock {
    address: Address,
    min_delay: u64,
    roles: HashMap<TimelockRole, BTreeSet<Address>>,
    /// When set, anyone may execute ready operations.
    open_executor: bool,
    operations: HashMap<OperationId, Operation>,
    balance: Amount,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Timelock {
    /// A timelock administered by `admin`. No proposers or executors yet.
    pub fn new(address: Address, min_delay: u64, admin: Address) -> Self {
        let mut roles: HashMap<TimelockRole, BTreeSet<Address>> = HashMap::new();
        roles.entry(TimelockRole::Admin).or_default().insert(admin);
        Self {
            address,
            min_delay,
            roles,
            open_executor: false,
            operations: HashMap::new(),
            balance: Amount::ZERO,
            events: Vec::new(),
        }
    }

    // ── Roles ────────────────────────────────────────────────────────────

    pub fn has_role(&self, role: TimelockRole, account: &Address) -> bool {
        if role == TimelockRole::Executor && self.open_executor {
            return true;
        }
        self.roles
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    pub fn grant_role(
        &mut self,
        caller: Address,
        role: TimelockRole,
        account: Address,
    ) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Admin, &caller)?;
        self.roles.entry(role).or_default().insert(account);
        tracing::info!(role = ?role, account = %account, "timelock role granted");
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: Address,
        role: TimelockRole,
        account: Address,
    ) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Admin, &caller)?;
        if let Some(set) = self.roles.get_mut(&role) {
            set.remove(&account);
        }
        tracing::info!(role = ?role, account = %account, "timelock role revoked");
        Ok(())
    }

    /// Let anyone execute ready operations (or restrict it again).
    pub fn set_open_executor(&mut self, caller: Address, open: bool) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Admin, &caller)?;
        self.open_executor = open;
        Ok(())
    }

    fn require_role(&self, role: TimelockRole, caller: &Address) -> Result<(), TimelockError> {
        if self.has_role(role, caller) {
            return Ok(());
        }
        tracing::warn!(caller = %caller, role = ?role, "timelock call rejected");
        Err(TimelockError::Unauthorized {
            caller: *caller,
            role,
        })
    }

    // ── Funds ────────────────────────────────────────────────────────────

    /// Accept value from `from` that the timelock can forward with calls.
    pub fn deposit(&mut self, from: Address, amount: Amount) -> Result<(), TimelockError> {
        if from.is_zero() {
            return Err(TimelockError::InvalidSender);
        }
        if amount.is_zero() {
            return Err(TimelockError::ZeroValue);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(TimelockError::Overflow)?;
        tracing::info!(from = %from, amount = %amount, "timelock funded");
        self.events.push(Event::TimelockFunded { from, amount });
        Ok(())
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Deterministic id for a call batch.
    pub fn hash_operation(
        calls: &[Call],
        predecessor: Option<OperationId>,
        salt: &[u8; 32],
    ) -> Result<OperationId, TimelockError> {
        let encoded = bincode::serialize(calls).map_err(|e| TimelockError::Encoding(e.to_string()))?;
        Ok(operation_id(&encoded, predecessor, salt))
    }

    pub fn schedule(
        &mut self,
        caller: Address,
        calls: Vec<Call>,
        predecessor: Option<OperationId>,
        salt: [u8; 32],
        delay: u64,
        now: Timestamp,
    ) -> Result<OperationId, TimelockError> {
        self.require_role(TimelockRole::Proposer, &caller)?;
        if calls.is_empty() {
            return Err(TimelockError::EmptyOperation);
        }
        if delay < self.min_delay {
            return Err(TimelockError::InsufficientDelay {
                delay,
                min: self.min_delay,
            });
        }
        let id = Self::hash_operation(&calls, predecessor, &salt)?;
        if self.operations.contains_key(&id) {
            return Err(TimelockError::OperationAlreadyScheduled(id));
        }
        let ready_at = now.plus(delay);
        for (index, call) in calls.iter().enumerate() {
            self.events.push(Event::CallScheduled {
                op: id,
                index,
                target: call.target,
                value: call.value,
                delay,
            });
        }
        tracing::info!(op = %id, calls = calls.len(), ready_at = %ready_at, "operation scheduled");
        self.operations.insert(
            id,
            Operation {
                id,
                calls,
                predecessor,
                salt,
                delay,
                ready_at,
                executed: false,
            },
        );
        Ok(id)
    }

    /// Run a ready operation against `target`.
    ///
    /// On any failure nothing changes: neither the target nor the operation.
    pub fn execute<T: CallTarget>(
        &mut self,
        caller: Address,
        id: OperationId,
        target: &mut T,
        now: Timestamp,
    ) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Executor, &caller)?;
        let op = self
            .operations
            .get(&id)
            .ok_or(TimelockError::OperationNotFound(id))?;
        if op.executed {
            return Err(TimelockError::NotPending(id));
        }
        if now < op.ready_at {
            return Err(TimelockError::NotReady {
                ready_at: op.ready_at,
            });
        }
        if let Some(pred) = op.predecessor {
            if !self.is_operation_done(&pred) {
                return Err(TimelockError::MissingPredecessor(pred));
            }
        }
        let needed = op.total_value().ok_or(TimelockError::Overflow)?;
        if needed > self.balance {
            return Err(TimelockError::InsufficientFunds {
                needed,
                available: self.balance,
            });
        }

        let mut staged = target.clone();
        for (index, call) in op.calls.iter().enumerate() {
            if call.target != staged.target_address() {
                return Err(TimelockError::UnknownTarget(call.target));
            }
            if let Err(e) = staged.apply(self.address, call.value, &call.data, now) {
                tracing::warn!(op = %id, index, error = %e, "timelocked call reverted");
                return Err(TimelockError::CallReverted {
                    index,
                    reason: e.to_string(),
                });
            }
        }

        let calls: Vec<(usize, Address, Amount)> = op
            .calls
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.target, c.value))
            .collect();
        *target = staged;
        self.balance = self.balance.saturating_sub(needed);
        if let Some(op) = self.operations.get_mut(&id) {
            op.executed = true;
        }
        for (index, target, value) in calls {
            self.events.push(Event::CallExecuted {
                op: id,
                index,
                target,
                value,
            });
        }
        tracing::info!(op = %id, "operation executed");
        Ok(())
    }

    /// Drop a pending operation.
    pub fn cancel(&mut self, caller: Address, id: OperationId) -> Result<(), TimelockError> {
        self.require_role(TimelockRole::Canceller, &caller)?;
        if !self.is_operation_pending(&id) {
            return Err(TimelockError::NotPending(id));
        }
        self.operations.remove(&id);
        tracing::info!(op = %id, "operation cancelled");
        self.events.push(Event::OperationCancelled { op: id });
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn operation(&self, id: &OperationId) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn is_operation_pending(&self, id: &OperationId) -> bool {
        self.operations.get(id).map(|op| !op.executed).unwrap_or(false)
    }

    pub fn is_operation_ready(&self, id: &OperationId, now: Timestamp) -> bool {
        self.operations
            .get(id)
            .map(|op| !op.executed && now >= op.ready_at)
            .unwrap_or(false)
    }

    pub fn is_operation_done(&self, id: &OperationId) -> bool {
        self.operations.get(id).map(|op| op.executed).unwrap_or(false)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
