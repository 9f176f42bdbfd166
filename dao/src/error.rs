use hopestream_credential::CredentialError;
use hopestream_governance::{GovernanceError, TimelockError};
use hopestream_types::ParamError;
use hopestream_vault::VaultError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("timelock error: {0}")]
    Timelock(#[from] TimelockError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("{0}")]
    Param(#[from] ParamError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaoError {
    /// Stable machine-readable reason code, taken from the innermost error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vault(e) => e.code(),
            Self::Governance(e) => e.code(),
            Self::Timelock(e) => e.code(),
            Self::Credential(e) => e.code(),
            Self::Param(_) => "ParameterOutOfRange",
            Self::Config(_) => "Config",
            Self::Snapshot(_) => "Snapshot",
            Self::Io(_) => "Io",
        }
    }
}
