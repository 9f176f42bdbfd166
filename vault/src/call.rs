//! Privileged vault calls as data.
//!
//! Governance proposals and timelock operations carry `VaultCall`s; the vault
//! applies one with `Vault::dispatch`.

use crate::roles::{Role, ADMIN_OR_GOVERNANCE, RELEASERS};
use hopestream_types::{Address, Amount, AntiSybilParams, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultCall {
    SetBeneficiary(Address),
    Pause,
    Unpause,
    AddMilestone {
        amount: Amount,
        release_time: Option<Timestamp>,
    },
    SetRelayer(Address),
    SetGovernance(Address),
    UpdateAntiSybilParameters(AntiSybilParams),
    DonateFromDao,
    ReleaseFunds,
}

impl VaultCall {
    /// Operation name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetBeneficiary(_) => "set_beneficiary",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::AddMilestone { .. } => "add_milestone",
            Self::SetRelayer(_) => "set_relayer",
            Self::SetGovernance(_) => "set_governance",
            Self::UpdateAntiSybilParameters(_) => "update_anti_sybil_parameters",
            Self::DonateFromDao => "donate_from_dao",
            Self::ReleaseFunds => "release_funds",
        }
    }

    /// Roles permitted to make this call.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::ReleaseFunds => RELEASERS,
            _ => ADMIN_OR_GOVERNANCE,
        }
    }

    /// Whether the call may carry value.
    pub fn accepts_value(&self) -> bool {
        matches!(self, Self::DonateFromDao)
    }

    /// Value-free calls may be forwarded with `Amount::ZERO` only.
    pub fn check_value(&self, value: Amount) -> bool {
        self.accepts_value() || value.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_release_is_open_to_relayer() {
        assert!(VaultCall::ReleaseFunds.allowed_roles().contains(&Role::Relayer));
        assert!(!VaultCall::Pause.allowed_roles().contains(&Role::Relayer));
        assert!(!VaultCall::SetBeneficiary(Address::repeat_byte(1))
            .allowed_roles()
            .contains(&Role::Relayer));
    }

    #[test]
    fn only_dao_donation_takes_value() {
        assert!(VaultCall::DonateFromDao.check_value(Amount::ether(1)));
        assert!(!VaultCall::Pause.check_value(Amount::new(1)));
        assert!(VaultCall::Pause.check_value(Amount::ZERO));
    }
}
