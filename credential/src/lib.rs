//! Soulbound donor credentials for the HopeStream DAO.
//!
//! Every qualifying donation mints one non-transferable credential that
//! remembers the amount donated. Voting weight is the sum of those amounts,
//! never the credential count. Weight only becomes votable once the holder
//! delegates (to itself or to someone else), and every weight-affecting
//! mutation is checkpointed so governance can read the weight as of a
//! proposal snapshot.

pub mod checkpoint;
pub mod credential;
pub mod error;
pub mod ledger;

pub use checkpoint::{Checkpoint, CheckpointHistory};
pub use credential::{Credential, DonorRecord, VotingBreakdown};
pub use error::CredentialError;
pub use ledger::CredentialLedger;
