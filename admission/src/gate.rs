//! Admission decision logic.

use crate::error::AdmissionError;
use hopestream_credential::DonorRecord;
use hopestream_types::{AntiSybilParams, Amount, ProgressiveCurve, Timestamp};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one donation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Mint a credential worth the donated value.
    Mint(Amount),
    /// Value is below the donor's current requirement.
    BelowThreshold { required: Amount },
    /// The donor already holds the maximum number of credentials.
    MaxReached,
    /// The donor's previous admitted donation is too recent.
    InCooldown { next_allowed: Timestamp },
}

impl Decision {
    pub fn is_mint(&self) -> bool {
        matches!(self, Self::Mint(_))
    }

    /// Short name used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mint(_) => "Mint",
            Self::BelowThreshold { .. } => "BelowThreshold",
            Self::MaxReached => "MaxReached",
            Self::InCooldown { .. } => "InCooldown",
        }
    }
}

/// Stateless evaluator. The donor state lives in the credential ledger and
/// the parameters live in the vault; the gate only owns the curve policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionGate {
    curve: ProgressiveCurve,
}

impl AdmissionGate {
    pub fn new(curve: ProgressiveCurve) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> ProgressiveCurve {
        self.curve
    }

    /// Decide whether `value` from a donor with `record` earns a credential at `now`.
    pub fn evaluate(
        &self,
        record: &DonorRecord,
        value: Amount,
        params: &AntiSybilParams,
        now: Timestamp,
    ) -> Result<Decision, AdmissionError> {
        if value.is_zero() {
            return Err(AdmissionError::ZeroValue);
        }
        let required = self.required_amount(record, params);
        if value < required {
            return Ok(Decision::BelowThreshold { required });
        }
        if record.credential_count >= params.max_credentials_per_address {
            return Ok(Decision::MaxReached);
        }
        if let Some(next_allowed) = self.next_allowed_time(record, params) {
            if now < next_allowed {
                return Ok(Decision::InCooldown { next_allowed });
            }
        }
        Ok(Decision::Mint(value))
    }

    /// Amount the donor's next donation must reach to mint.
    pub fn required_amount(&self, record: &DonorRecord, params: &AntiSybilParams) -> Amount {
        self.curve
            .required(params.minimum_donation_for_credential, record.credential_count)
    }

    /// Earliest time the donor may mint again, or `None` if never admitted.
    pub fn next_allowed_time(
        &self,
        record: &DonorRecord,
        params: &AntiSybilParams,
    ) -> Option<Timestamp> {
        record
            .last_donation
            .map(|last| last.plus(params.donation_cooldown_secs))
    }
}
