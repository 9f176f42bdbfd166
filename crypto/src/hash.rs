//! Blake2b hashing and identifier derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use hopestream_types::{OperationId, ProposalId};

type Blake2b256 = Blake2b<U32>;

const PROPOSAL_DOMAIN: &[u8] = b"hopestream/proposal";
const OPERATION_DOMAIN: &[u8] = b"hopestream/operation";

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Digest of a proposal's human-readable description.
pub fn description_hash(description: &str) -> [u8; 32] {
    blake2b_256(description.as_bytes())
}

/// Proposal id over the encoded call list and the description hash.
///
/// Two proposals with identical calls and description collide on purpose,
/// which is how duplicate submissions are detected.
pub fn proposal_id(encoded_calls: &[u8], description: &str) -> ProposalId {
    let desc = description_hash(description);
    ProposalId::new(blake2b_256_multi(&[PROPOSAL_DOMAIN, encoded_calls, &desc]))
}

/// Timelock operation id over the encoded call list, predecessor and salt.
pub fn operation_id(
    encoded_calls: &[u8],
    predecessor: Option<OperationId>,
    salt: &[u8; 32],
) -> OperationId {
    let pred = predecessor.unwrap_or(OperationId::ZERO);
    OperationId::new(blake2b_256_multi(&[
        OPERATION_DOMAIN,
        encoded_calls,
        pred.as_bytes(),
        salt,
    ]))
}
