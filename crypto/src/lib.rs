//! Hashing primitives for the HopeStream DAO.
//!
//! - **Blake2b-256** for every digest in the system
//! - Proposal ids derived from the encoded call list and the description
//! - Timelock operation ids derived from calls, predecessor and salt

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, description_hash, operation_id, proposal_id};
