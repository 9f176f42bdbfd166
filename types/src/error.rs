//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for parsing and validating shared primitives.
#[derive(Debug, Error)]
pub enum HopeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("{0}")]
    Other(String),
}

impl HopeError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "InvalidAddress",
            Self::Overflow => "Overflow",
            Self::Other(_) => "Other",
        }
    }
}
