//! Anti-Sybil admission gate.
//!
//! Decides, per incoming donation, whether the donor earns a new credential.
//! Checks run in a fixed order: zero value, progressive threshold, per-address
//! cap, cooldown. Only the zero-value case is an error; every other outcome is
//! a `Decision` and the donation itself is always kept by the vault.

pub mod error;
pub mod gate;

pub use error::AdmissionError;
pub use gate::{AdmissionGate, Decision};
