use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Represents a block in the blockchain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Creation time in nanoseconds since the Unix epoch (informational only)
    pub timestamp: i64,

    /// Proof of work (nonce)
    pub nonce: u64,

    /// Hash of the previous block
    #[serde(with = "hex::serde")]
    #[schema(value_type = String, example = "000a3f...")]
    pub previous_hash: [u8; 32],

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `nonce` - The proof of work nonce
    /// * `previous_hash` - The hash of the previous block
    /// * `transactions` - The transactions included in the block
    ///
    /// # Returns
    ///
    /// A new Block instance
    pub fn new(nonce: u64, previous_hash: [u8; 32], transactions: Vec<Transaction>) -> Self {
        Block {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            nonce,
            previous_hash,
            transactions,
        }
    }

    /// Calculates the SHA-256 hash of the block
    ///
    /// The timestamp is not part of the hash, so a block hashes exactly like
    /// the candidate evaluated by the proof of work search.
    pub fn hash(&self) -> [u8; 32] {
        Self::compute_hash(self.nonce, &self.previous_hash, &self.transactions)
    }

    /// The block hash as a lowercase hex string
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Hashes the canonical encoding of a block's contents
    pub fn compute_hash(nonce: u64, previous_hash: &[u8; 32], transactions: &[Transaction]) -> [u8; 32] {
        let encoded = Self::canonical_bytes(nonce, previous_hash, transactions);
        Sha256::digest(encoded).into()
    }

    fn canonical_bytes(nonce: u64, previous_hash: &[u8; 32], transactions: &[Transaction]) -> Vec<u8> {
        let transactions: Vec<serde_json::Value> =
            transactions.iter().map(Transaction::canonical_value).collect();

        serde_json::json!({
            "nonce": nonce,
            "previous_hash": hex::encode(previous_hash),
            "transactions": transactions,
        })
        .to_string()
        .into_bytes()
    }
}
