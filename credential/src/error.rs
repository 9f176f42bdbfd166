use hopestream_types::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Soulbound: non-transferable")]
    SoulboundViolation,

    #[error("credential cap reached: {owner} holds {held} of {cap}")]
    CapacityError { owner: Address, held: u32, cap: u32 },

    #[error("invalid address: the zero address cannot hold or receive votes")]
    InvalidAddress,

    #[error("credential {0} does not exist")]
    NotFound(u64),

    #[error("arithmetic overflow")]
    Overflow,
}

impl CredentialError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SoulboundViolation => "SoulboundViolation",
            Self::CapacityError { .. } => "CapacityError",
            Self::InvalidAddress => "InvalidAddress",
            Self::NotFound(_) => "CredentialNotFound",
            Self::Overflow => "Overflow",
        }
    }
}
