use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{info, warn};
use p256::ecdsa::VerifyingKey;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::{LedgerConfig, PoolPolicy};

use super::address::Address;
use super::block::Block;
use super::crypto::DigitalSignature;
use super::pow::ProofOfWork;
use super::transaction::{Transaction, TransactionError};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Mining was cancelled")]
    MiningCancelled,

    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

/// Read-only view of the chain as served to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainView {
    pub chains: Vec<Block>,
}

/// Represents the blockchain
///
/// The ledger is the only writer of its chain and transaction pool. Clones
/// share the same state, and every mutation goes through the methods below.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, never empty
    chain: Arc<RwLock<Vec<Block>>>,

    /// Pending transactions to be included in the next block
    transaction_pool: Arc<Mutex<Vec<Transaction>>>,

    /// Held for the whole of a mining run so blocks are appended one at a time
    mining: Arc<Mutex<()>>,

    /// Receiver of mining rewards
    blockchain_address: Address,

    config: LedgerConfig,

    proof_of_work: ProofOfWork,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block and the default
    /// configuration
    pub fn new(blockchain_address: Address) -> Self {
        Self::with_config(blockchain_address, LedgerConfig::default())
    }

    /// Creates a new blockchain with a genesis block
    ///
    /// # Arguments
    ///
    /// * `blockchain_address` - The address that receives mining rewards
    /// * `config` - Difficulty, reward, pool policy and balance enforcement
    ///
    /// # Returns
    ///
    /// A new Blockchain instance holding only the genesis block
    pub fn with_config(blockchain_address: Address, config: LedgerConfig) -> Self {
        let blockchain = Blockchain {
            chain: Arc::new(RwLock::new(Vec::new())),
            transaction_pool: Arc::new(Mutex::new(Vec::new())),
            mining: Arc::new(Mutex::new(())),
            blockchain_address,
            proof_of_work: ProofOfWork::new(config.difficulty),
            config,
        };

        blockchain.create_genesis_block();
        blockchain
    }

    /// Creates the genesis block (first block in the chain)
    fn create_genesis_block(&self) {
        let genesis_block = Block::new(0, Block::default().hash(), Vec::new());
        info!("Created genesis block with hash {}", genesis_block.hash_hex());
        self.chain.write().push(genesis_block);
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Block {
        self.chain
            .read()
            .last()
            .cloned()
            .expect("chain always contains the genesis block")
    }

    /// Number of blocks in the chain, genesis included
    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    /// Adds a transaction to the pool
    ///
    /// Reward transactions are admitted as they are. Any other transaction
    /// needs the sender's public key and a signature over its canonical
    /// encoding, and the key has to derive the sender address. With balance
    /// enforcement on, the sender's on-chain balance minus its transfers
    /// still waiting in the pool has to cover `value`.
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `value` - The amount to transfer
    /// * `sender_public_key` - The sender's public key
    /// * `signature` - The sender's signature over the transaction
    ///
    /// # Returns
    ///
    /// Ok(()) if the transaction was added to the pool
    pub fn add_transaction(
        &self,
        sender: &Address,
        recipient: &Address,
        value: f64,
        sender_public_key: Option<&VerifyingKey>,
        signature: Option<&DigitalSignature>,
    ) -> Result<(), BlockchainError> {
        let transaction = Transaction::new(sender.clone(), recipient.clone(), value);

        if transaction.is_reward() {
            self.transaction_pool.lock().push(transaction);
            return Ok(());
        }

        if !value.is_finite() || value <= 0.0 {
            return Err(TransactionError::InvalidAmount(format!(
                "Amount must be a positive number: {}",
                value
            ))
            .into());
        }

        let (public_key, signature) = match (sender_public_key, signature) {
            (Some(public_key), Some(signature)) => (public_key, signature),
            _ => return Err(TransactionError::MissingKeyMaterial.into()),
        };

        if !transaction.verify(public_key, signature) {
            return Err(TransactionError::InvalidSignature.into());
        }

        if Address::from_public_key(public_key) != *sender {
            return Err(TransactionError::SenderKeyMismatch(sender.clone()).into());
        }

        // The check and the push share the pool lock so concurrent spends
        // cannot both pass against the same funds
        let mut pool = self.transaction_pool.lock();

        if self.config.enforce_balance {
            let pending: f64 = pool
                .iter()
                .filter(|pooled| pooled.sender == *sender)
                .map(|pooled| pooled.value)
                .sum();
            let available = self.balance(sender) - pending;

            if available < value {
                return Err(TransactionError::InsufficientFunds {
                    required: value,
                    available,
                }
                .into());
            }
        }

        pool.push(transaction);
        Ok(())
    }

    /// Submits a transaction, reporting only whether it was admitted
    ///
    /// Rejections are logged and leave the pool unchanged.
    pub fn submit_transaction(
        &self,
        sender: &Address,
        recipient: &Address,
        value: f64,
        sender_public_key: Option<&VerifyingKey>,
        signature: Option<&DigitalSignature>,
    ) -> bool {
        match self.add_transaction(sender, recipient, value, sender_public_key, signature) {
            Ok(()) => true,
            Err(BlockchainError::TransactionError(TransactionError::InvalidSignature)) => {
                warn!("Signature verification failed for transaction from {}", sender);
                false
            }
            Err(err) => {
                warn!("Rejected transaction from {}: {}", sender, err);
                false
            }
        }
    }

    /// Mines a new block with the pending transactions and a reward for the
    /// ledger's address
    ///
    /// Runs the proof of work search to completion on the calling thread.
    ///
    /// # Returns
    ///
    /// The newly mined block, already appended to the chain
    pub fn mine(&self) -> Block {
        let _guard = self.mining.lock();

        let (transactions, previous_hash) = self.prepare_candidate();
        let nonce = self.proof_of_work.find_nonce(&previous_hash, &transactions);

        self.append_block(nonce, previous_hash, transactions)
    }

    /// Mines a new block, giving up when `cancel` is set
    ///
    /// A cancelled run withdraws its reward transaction and leaves the chain
    /// and the rest of the pool as they were.
    pub fn mine_cancellable(&self, cancel: &AtomicBool) -> Result<Block, BlockchainError> {
        let _guard = self.mining.lock();

        let (transactions, previous_hash) = self.prepare_candidate();

        match self
            .proof_of_work
            .find_nonce_cancellable(&previous_hash, &transactions, cancel)
        {
            Some(nonce) => Ok(self.append_block(nonce, previous_hash, transactions)),
            None => {
                self.withdraw_reward(transactions.len() - 1);
                warn!("Mining cancelled before a valid nonce was found");
                Err(BlockchainError::MiningCancelled)
            }
        }
    }

    /// Queues the reward and snapshots the pool and the chain tip
    ///
    /// The reward is pushed under the same lock as the snapshot is taken, so
    /// it is always the snapshot's last transaction.
    fn prepare_candidate(&self) -> (Vec<Transaction>, [u8; 32]) {
        let reward = Transaction::new_reward(self.blockchain_address.clone(), self.config.mining_reward);

        let transactions = {
            let mut pool = self.transaction_pool.lock();
            pool.push(reward);
            pool.clone()
        };

        let previous_hash = self.last_block().hash();
        (transactions, previous_hash)
    }

    fn append_block(&self, nonce: u64, previous_hash: [u8; 32], transactions: Vec<Transaction>) -> Block {
        let captured = transactions.len();
        let block = Block::new(nonce, previous_hash, transactions);

        let mut pool = self.transaction_pool.lock();
        self.chain.write().push(block.clone());

        // Only this run removes from the pool, so the snapshot is still its prefix
        if self.config.pool_policy == PoolPolicy::ClearAfterMining {
            pool.drain(..captured);
        }

        info!(
            "Mined block {} with nonce {} and {} transactions",
            block.hash_hex(),
            block.nonce,
            block.transactions.len()
        );

        block
    }

    fn withdraw_reward(&self, index: usize) {
        let mut pool = self.transaction_pool.lock();
        if pool.get(index).map_or(false, Transaction::is_reward) {
            pool.remove(index);
        }
    }

    /// Calculates the balance of an address from every transaction in the
    /// chain
    pub fn balance(&self, address: &Address) -> f64 {
        let chain = self.chain.read();

        chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .fold(0.0, |mut total, transaction| {
                if transaction.recipient == *address {
                    total += transaction.value;
                }
                if transaction.sender == *address {
                    total -= transaction.value;
                }
                total
            })
    }

    /// Gets the entire blockchain
    pub fn chain(&self) -> Vec<Block> {
        self.chain.read().clone()
    }

    pub fn chain_view(&self) -> ChainView {
        ChainView {
            chains: self.chain(),
        }
    }

    /// Gets all pending transactions
    pub fn transaction_pool(&self) -> Vec<Transaction> {
        self.transaction_pool.lock().clone()
    }

    /// Checks hash linkage and difficulty of every block after genesis
    pub fn validate(&self) -> Result<(), BlockchainError> {
        let chain = self.chain.read();

        for (index, pair) in chain.windows(2).enumerate() {
            let (previous_block, current_block) = (&pair[0], &pair[1]);
            let height = index + 1;

            if current_block.previous_hash != previous_block.hash() {
                return Err(BlockchainError::InvalidChain(format!(
                    "block {} does not link to its predecessor",
                    height
                )));
            }

            if !self.proof_of_work.meets_difficulty(&current_block.hash()) {
                return Err(BlockchainError::InvalidChain(format!(
                    "block {} does not meet difficulty {}",
                    height,
                    self.proof_of_work.difficulty()
                )));
            }
        }

        Ok(())
    }

    /// Validates the blockchain
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
