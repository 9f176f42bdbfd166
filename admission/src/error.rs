use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("donation value must be greater than zero")]
    ZeroValue,
}

impl AdmissionError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroValue => "ZeroValue",
        }
    }
}
