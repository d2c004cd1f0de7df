// Blockchain module
//
// This module contains the core ledger implementation including:
// - Address derivation
// - Key pairs and ECDSA signatures
// - Transaction structure
// - Block structure
// - Proof of work algorithm
// - Blockchain structure

pub mod address;
pub mod block;
pub mod chain;
pub mod crypto;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use address::Address;
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, ChainView};
pub use crypto::{CryptoError, DigitalSignature, Wallet};
pub use pow::ProofOfWork;
pub use transaction::{Transaction, TransactionError};
