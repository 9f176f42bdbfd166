//! The HopeStream donation vault.
//!
//! Holds donated funds, consults the admission gate on every donation, issues
//! credentials through the ledger it owns, and pays the beneficiary as
//! milestones mature. Every privileged mutator is reachable both as a direct
//! method and as a `VaultCall` value, which is what governance schedules on the
//! timelock.

pub mod call;
pub mod error;
pub mod milestone;
pub mod roles;
pub mod vault;

pub use call::VaultCall;
pub use error::VaultError;
pub use milestone::Milestone;
pub use roles::{Role, Roles};
pub use vault::{DonorInfo, Vault, VaultStats};
