//! Donation-weighted governance for the HopeStream vault.
//!
//! Proposals are voted on with the credential ledger's delegated weight as it
//! stood when the proposal was created. Passed proposals are scheduled on a
//! timelock and, after its minimum delay, applied to the vault as a single
//! all-or-nothing batch of calls.

pub mod engine;
pub mod error;
pub mod proposal;
pub mod timelock;

pub use engine::GovernanceEngine;
pub use error::{GovernanceError, TimelockError};
pub use proposal::{Proposal, ProposalAction, ProposalState, ProposalVotes, Receipt};
pub use timelock::{Call, CallTarget, Operation, Timelock, TimelockRole};
