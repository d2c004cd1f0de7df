//! A single-authority proof-of-work ledger.
//!
//! Transactions are signed with ECDSA over P-256, admitted into a pending pool
//! by the [`blockchain::Blockchain`] once their signature verifies, and sealed
//! into hash-linked blocks by a brute-force nonce search. The [`api`] module
//! exposes the ledger over HTTP.

pub mod api;
pub mod blockchain;
pub mod config;

pub use blockchain::{Address, Block, Blockchain, Transaction, Wallet};
pub use config::{LedgerConfig, PoolPolicy, ServerConfig};
