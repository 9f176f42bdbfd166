use hopestream_admission::AdmissionError;
use hopestream_credential::CredentialError;
use hopestream_types::{Address, Amount, ParamError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("No ETH sent")]
    ZeroValue,

    #[error("unauthorized: {caller} may not call {operation}")]
    Unauthorized {
        caller: Address,
        operation: &'static str,
    },

    #[error("Pausable: paused")]
    EnforcedPause,

    #[error("Pausable: not paused")]
    ExpectedPause,

    #[error("Release amount must be greater than zero")]
    InvalidAmount,

    #[error("Release time must be in the future")]
    InvalidTime,

    #[error("Invalid {0} address")]
    InvalidAddress(&'static str),

    #[error("Insufficient balance for release: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("{0}")]
    ParameterOutOfRange(#[from] ParamError),

    #[error("{operation} does not accept value")]
    ValueNotAccepted { operation: &'static str },

    #[error("milestone {0} does not exist")]
    MilestoneNotFound(usize),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("arithmetic overflow")]
    Overflow,
}

impl From<AdmissionError> for VaultError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::ZeroValue => Self::ZeroValue,
        }
    }
}

impl VaultError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroValue => "ZeroValue",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::EnforcedPause => "EnforcedPause",
            Self::ExpectedPause => "ExpectedPause",
            Self::InvalidAmount => "InvalidAmount",
            Self::InvalidTime => "InvalidTime",
            Self::InvalidAddress(_) => "InvalidAddress",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::ParameterOutOfRange(_) => "ParameterOutOfRange",
            Self::ValueNotAccepted { .. } => "ValueNotAccepted",
            Self::MilestoneNotFound(_) => "MilestoneNotFound",
            Self::Credential(e) => e.code(),
            Self::Overflow => "Overflow",
        }
    }
}
