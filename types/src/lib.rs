//! Fundamental types for the HopeStream donation DAO.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, amounts, timestamps, digests, anti-Sybil and governance parameters,
//! and the audit-log event stream.

pub mod address;
pub mod amount;
pub mod error;
pub mod event;
pub mod hash;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::{Amount, WEI_PER_ETHER};
pub use error::HopeError;
pub use event::{AuditLog, AuditRecord, Event, ProposalActionType, VoteSupport};
pub use hash::{OperationId, ProposalId};
pub use params::{
    AntiSybilParams, GovernanceParams, ParamError, ProgressiveCurve, MAX_COOLDOWN_SECS,
    MAX_CREDENTIALS_CAP,
};
pub use time::{Clock, Timestamp, MILESTONE_MATURATION_SECS, ONE_DAY_SECS};
