//! Caller capabilities.
//!
//! Each privileged operation names the set of roles allowed to call it; a
//! caller passes if it holds any of them.

use crate::error::VaultError;
use hopestream_types::Address;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The deployer/owner.
    Admin,
    /// The governance timelock.
    Governance,
    /// The automation agent that triggers releases.
    Relayer,
}

/// Admin or governance.
pub const ADMIN_OR_GOVERNANCE: &[Role] = &[Role::Admin, Role::Governance];

/// Admin, governance or relayer.
pub const RELEASERS: &[Role] = &[Role::Admin, Role::Governance, Role::Relayer];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub admin: Address,
    pub governance: Option<Address>,
    pub relayer: Option<Address>,
}

impl Roles {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            governance: None,
            relayer: None,
        }
    }

    pub fn holds(&self, caller: &Address, role: Role) -> bool {
        if caller.is_zero() {
            return false;
        }
        match role {
            Role::Admin => self.admin == *caller,
            Role::Governance => self.governance == Some(*caller),
            Role::Relayer => self.relayer == Some(*caller),
        }
    }

    /// Fail with `Unauthorized` unless `caller` holds one of `allowed`.
    pub fn require(
        &self,
        caller: &Address,
        allowed: &[Role],
        operation: &'static str,
    ) -> Result<(), VaultError> {
        if allowed.iter().any(|r| self.holds(caller, *r)) {
            return Ok(());
        }
        tracing::warn!(caller = %caller, operation, "rejected privileged call");
        Err(VaultError::Unauthorized {
            caller: *caller,
            operation,
        })
    }
}
