use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod constants;
pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::Ledger;

/// A transfer of `amount` from `sender` to `recipient`. Owned by the
/// pending pool until it is captured into a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

/// One block of the chain. Immutable once created; `index` starts at 1
/// and is gapless, `previous_hash` links to the digest of the
/// predecessor (or the virtual genesis for the first block).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

/// The virtual predecessor of an empty chain. Used for hashing and
/// proof continuity only; never stored.
pub fn genesis_block() -> Block {
    Block {
        index: 0,
        timestamp: 0.0,
        transactions: vec![],
        proof: 0,
        previous_hash: String::new(),
    }
}

/// Lowercase hex SHA-256 over the block's canonical byte form.
///
/// The canonical form is the JSON rendering of the struct, so field
/// order is fixed by the declaration above and numeric formatting is
/// locale-independent. Equal field values always produce equal digests.
pub fn block_hash(block: &Block) -> String {
    let bytes = serde_json::to_vec(block).expect("block serializes");
    hex::encode(Sha256::digest(&bytes))
}

pub mod pow {
    use crate::constants::DIFFICULTY_PREFIX;
    use sha2::{Digest, Sha256};

    /// True iff the digest of the decimal concatenation of both proofs
    /// starts with the difficulty prefix.
    pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
        let digest = Sha256::digest(format!("{last_proof}{proof}").as_bytes());
        hex::encode(digest).starts_with(DIFFICULTY_PREFIX)
    }

    /// Brute-force the smallest proof valid against `last_proof`.
    /// Minimality is part of the contract, so candidates are tried in
    /// order from zero.
    pub fn find_proof(last_proof: u64) -> u64 {
        let mut proof = 0;
        while !valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }
}

pub mod validate {
    use crate::{block_hash, pow, Block};
    use tracing::debug;

    /// Check link hashes and proof continuity across every adjacent
    /// pair of `chain`, over the candidate's full length. Chains of
    /// length 0 or 1 are trivially valid.
    pub fn is_valid_chain(chain: &[Block]) -> bool {
        for pair in chain.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.previous_hash != block_hash(prev) {
                debug!(index = cur.index, "broken hash link");
                return false;
            }
            if !pow::valid_proof(prev.proof, cur.proof) {
                debug!(index = cur.index, "invalid proof of work");
                return false;
            }
        }
        true
    }
}
