use crate::proposal::ProposalState;
use crate::timelock::TimelockRole;
use hopestream_types::{Address, Amount, OperationId, ParamError, ProposalId, Timestamp};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelockError {
    #[error("unauthorized: {caller} lacks the {role:?} role")]
    Unauthorized { caller: Address, role: TimelockRole },

    #[error("delay {delay}s is below the minimum of {min}s")]
    InsufficientDelay { delay: u64, min: u64 },

    #[error("operation {0} is already scheduled")]
    OperationAlreadyScheduled(OperationId),

    #[error("operation {0} not found")]
    OperationNotFound(OperationId),

    #[error("operation {0} is not pending")]
    NotPending(OperationId),

    #[error("operation is not ready until {ready_at}")]
    NotReady { ready_at: Timestamp },

    #[error("predecessor {0} has not been executed")]
    MissingPredecessor(OperationId),

    #[error("no call target at {0}")]
    UnknownTarget(Address),

    #[error("timelock holds {available}, operation needs {needed}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("call {index} reverted: {reason}")]
    CallReverted { index: usize, reason: String },

    #[error("operation has no calls")]
    EmptyOperation,

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("deposit must come from a nonzero sender")]
    InvalidSender,

    #[error("deposit must carry value")]
    ZeroValue,

    #[error("arithmetic overflow")]
    Overflow,
}

impl TimelockError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::InsufficientDelay { .. } => "InsufficientDelay",
            Self::OperationAlreadyScheduled(_) => "OperationAlreadyScheduled",
            Self::OperationNotFound(_) => "OperationNotFound",
            Self::NotPending(_) => "OperationNotPending",
            Self::NotReady { .. } => "OperationNotReady",
            Self::MissingPredecessor(_) => "MissingPredecessor",
            Self::UnknownTarget(_) => "UnknownTarget",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::CallReverted { .. } => "CallReverted",
            Self::EmptyOperation => "EmptyOperation",
            Self::Encoding(_) => "Encoding",
            Self::InvalidSender => "InvalidAddress",
            Self::ZeroValue => "ZeroValue",
            Self::Overflow => "Overflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} already exists")]
    ProposalAlreadyExists(ProposalId),

    #[error("proposer votes below threshold: have {have}, need {need}")]
    InsufficientProposerVotes { have: Amount, need: Amount },

    #[error("voting is not active (proposal is {0})")]
    VotingNotActive(ProposalState),

    #[error("{0} has already voted on this proposal")]
    AlreadyVoted(Address),

    #[error("proposal is {actual}, expected {expected}")]
    UnexpectedState {
        expected: ProposalState,
        actual: ProposalState,
    },

    #[error("only the proposer can cancel a proposal")]
    NotProposer,

    #[error("Invalid {0} address")]
    InvalidAddress(&'static str),

    #[error("Release amount must be greater than zero")]
    InvalidAmount,

    #[error("Release time must be in the future")]
    InvalidTime,

    #[error("{0}")]
    ParameterOutOfRange(#[from] ParamError),

    #[error("proposal has no calls")]
    EmptyProposal,

    #[error("timelock error: {0}")]
    Timelock(#[from] TimelockError),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl GovernanceError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProposalNotFound(_) => "ProposalNotFound",
            Self::ProposalAlreadyExists(_) => "ProposalAlreadyExists",
            Self::InsufficientProposerVotes { .. } => "InsufficientProposerVotes",
            Self::VotingNotActive(_) => "VotingNotActive",
            Self::AlreadyVoted(_) => "AlreadyVoted",
            Self::UnexpectedState { .. } => "UnexpectedProposalState",
            Self::NotProposer => "NotProposer",
            Self::InvalidAddress(_) => "InvalidAddress",
            Self::InvalidAmount => "InvalidAmount",
            Self::InvalidTime => "InvalidTime",
            Self::ParameterOutOfRange(_) => "ParameterOutOfRange",
            Self::EmptyProposal => "EmptyProposal",
            Self::Timelock(e) => e.code(),
            Self::Encoding(_) => "Encoding",
        }
    }
}
