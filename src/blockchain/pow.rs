use std::sync::atomic::{AtomicBool, Ordering};

use super::block::Block;
use super::transaction::Transaction;

/// How many nonces are tried between two looks at the cancellation flag
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Brute-force nonce search over a leading-zero hex difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    /// Creates a search for `difficulty` leading zero hex characters
    ///
    /// A SHA-256 hash has 64 hex characters, so larger values are clamped.
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork {
            difficulty: difficulty.min(64),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Checks whether a hash starts with the required zero hex characters
    pub fn meets_difficulty(&self, hash: &[u8; 32]) -> bool {
        let target = "0".repeat(self.difficulty);
        hex::encode(hash).starts_with(&target)
    }

    /// Checks a candidate nonce against the difficulty
    pub fn valid_proof(&self, nonce: u64, previous_hash: &[u8; 32], transactions: &[Transaction]) -> bool {
        self.meets_difficulty(&Block::compute_hash(nonce, previous_hash, transactions))
    }

    /// Returns the first nonce, counting up from zero, whose block hash meets
    /// the difficulty
    ///
    /// This blocks the calling thread for as long as the search takes.
    pub fn find_nonce(&self, previous_hash: &[u8; 32], transactions: &[Transaction]) -> u64 {
        let mut nonce = 0;
        while !self.valid_proof(nonce, previous_hash, transactions) {
            nonce += 1;
        }
        nonce
    }

    /// Like [`ProofOfWork::find_nonce`], but gives up with `None` once
    /// `cancel` is set
    pub fn find_nonce_cancellable(
        &self,
        previous_hash: &[u8; 32],
        transactions: &[Transaction],
        cancel: &AtomicBool,
    ) -> Option<u64> {
        let mut nonce = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return None;
            }

            if self.valid_proof(nonce, previous_hash, transactions) {
                return Some(nonce);
            }

            nonce += 1;
        }
    }
}
