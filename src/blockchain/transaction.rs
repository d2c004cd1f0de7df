use log::debug;
use p256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::MINING_SENDER;

use super::address::Address;
use super::crypto::{sign_digest, verify_digest, CryptoError, DigitalSignature, Wallet};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Invalid sender address: {0}")]
    InvalidSenderAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Missing sender public key or signature")]
    MissingKeyMaterial,

    #[error("Public key does not belong to sender {0}")]
    SenderKeyMismatch(Address),

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Represents a value transfer between two addresses
///
/// The same three fields are signed by the sender, verified by the ledger and
/// stored in blocks. No key material is ever part of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    #[serde(rename = "sender_blockchain_address")]
    pub sender: Address,

    /// Recipient's address
    #[serde(rename = "recipient_blockchain_address")]
    pub recipient: Address,

    /// Amount being transferred
    pub value: f64,
}

impl Transaction {
    /// Creates a new unsigned transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `value` - The amount to transfer
    ///
    /// # Returns
    ///
    /// A new Transaction instance
    pub fn new(sender: Address, recipient: Address, value: f64) -> Self {
        Transaction {
            sender,
            recipient,
            value,
        }
    }

    /// Creates a new reward transaction issued by the ledger itself
    pub fn new_reward(recipient: Address, value: f64) -> Self {
        Transaction {
            sender: Address(MINING_SENDER.to_string()),
            recipient,
            value,
        }
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.0 == MINING_SENDER
    }

    /// The canonical byte encoding used for signing, verification and block
    /// hashing
    ///
    /// Compact JSON with the keys `recipient_blockchain_address`,
    /// `sender_blockchain_address` and `value` in that order. Non-finite
    /// values all encode as `null`, so they are refused before signing.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.canonical_value().to_string().into_bytes()
    }

    pub(crate) fn canonical_value(&self) -> serde_json::Value {
        serde_json::json!({
            "sender_blockchain_address": self.sender.0,
            "recipient_blockchain_address": self.recipient.0,
            "value": self.value,
        })
    }

    /// SHA-256 of the canonical encoding
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.canonical_bytes()).into()
    }

    /// Signs the transaction with a wallet whose address must be the sender
    pub fn sign(&self, wallet: &Wallet) -> Result<DigitalSignature, TransactionError> {
        if wallet.address() != &self.sender {
            return Err(TransactionError::InvalidSenderAddress(
                "Wallet address does not match sender address".to_string(),
            ));
        }

        self.sign_with_key(wallet.signing_key())
    }

    /// Signs the transaction hash with a private key
    pub fn sign_with_key(&self, signing_key: &SigningKey) -> Result<DigitalSignature, TransactionError> {
        if !self.value.is_finite() {
            return Err(TransactionError::InvalidAmount(format!(
                "value must be finite, got {}",
                self.value
            )));
        }

        sign_digest(signing_key, &self.hash()).map_err(TransactionError::from)
    }

    /// Verifies a signature over this transaction
    ///
    /// Any mismatch, including a signature that cannot be decoded, yields
    /// `false`.
    pub fn verify(&self, public_key: &VerifyingKey, signature: &DigitalSignature) -> bool {
        match verify_digest(&self.hash(), signature, public_key) {
            Ok(valid) => valid,
            Err(err) => {
                debug!("Rejecting malformed signature from {}: {}", self.sender, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(sender: &Wallet, recipient: &Wallet, value: f64) -> Transaction {
        Transaction::new(sender.address().clone(), recipient.address().clone(), value)
    }

    #[test]
    fn test_new_transaction() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        let transaction = transfer(&sender_wallet, &recipient_wallet, 10.5);

        assert_eq!(transaction.sender, *sender_wallet.address());
        assert_eq!(transaction.recipient, *recipient_wallet.address());
        assert_eq!(transaction.value, 10.5);
        assert!(!transaction.is_reward());
    }

    #[test]
    fn test_reward_transaction() {
        let miner_wallet = Wallet::new();
        let transaction = Transaction::new_reward(miner_wallet.address().clone(), 1.0);

        assert_eq!(transaction.sender.0, "THE BLOCKCHAIN");
        assert_eq!(transaction.recipient, *miner_wallet.address());
        assert!(transaction.is_reward());
    }

    #[test]
    fn test_canonical_encoding() {
        let transaction = Transaction::new(Address::from("A"), Address::from("B"), 1.0);

        assert_eq!(
            String::from_utf8(transaction.canonical_bytes()).unwrap(),
            r#"{"recipient_blockchain_address":"B","sender_blockchain_address":"A","value":1.0}"#
        );
    }

    #[test]
    fn test_canonical_encoding_is_shared_by_every_path() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        // Signer side: built from wallet addresses
        let signed_side = transfer(&sender_wallet, &recipient_wallet, 2.25);

        // Ledger side: rebuilt from the submitted wire form
        let wire = serde_json::to_string(&signed_side).unwrap();
        let ledger_side: Transaction = serde_json::from_str(&wire).unwrap();
        let from_fields = Transaction::new(
            Address(sender_wallet.address().0.clone()),
            Address(recipient_wallet.address().0.clone()),
            2.25,
        );

        assert_eq!(signed_side.canonical_bytes(), ledger_side.canonical_bytes());
        assert_eq!(signed_side.canonical_bytes(), from_fields.canonical_bytes());
        assert_eq!(signed_side.hash(), from_fields.hash());
    }

    #[test]
    fn test_wire_form_field_names() {
        let transaction = Transaction::new(Address::from("A"), Address::from("B"), 1.5);
        let value = serde_json::to_value(&transaction).unwrap();

        assert_eq!(value["sender_blockchain_address"], "A");
        assert_eq!(value["recipient_blockchain_address"], "B");
        assert_eq!(value["value"], 1.5);
    }

    #[test]
    fn test_sign_and_verify() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();
        let transaction = transfer(&sender_wallet, &recipient_wallet, 1.0);

        let signature = transaction.sign(&sender_wallet).unwrap();

        assert!(transaction.verify(sender_wallet.public_key(), &signature));
        assert!(!transaction.verify(recipient_wallet.public_key(), &signature));
    }

    #[test]
    fn test_tampered_fields_fail_verification() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();
        let other_wallet = Wallet::new();
        let transaction = transfer(&sender_wallet, &recipient_wallet, 1.0);
        let signature = transaction.sign(&sender_wallet).unwrap();

        let mut tampered = transaction.clone();
        tampered.value = 1.5;
        assert!(!tampered.verify(sender_wallet.public_key(), &signature));

        let mut tampered = transaction.clone();
        tampered.recipient = other_wallet.address().clone();
        assert!(!tampered.verify(sender_wallet.public_key(), &signature));

        let mut tampered = transaction;
        tampered.sender = other_wallet.address().clone();
        assert!(!tampered.verify(sender_wallet.public_key(), &signature));
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();
        let transaction = transfer(&sender_wallet, &recipient_wallet, 1.0);

        let garbage = DigitalSignature("not a signature".to_string());
        assert!(!transaction.verify(sender_wallet.public_key(), &garbage));
    }

    #[test]
    fn test_non_finite_value_cannot_be_signed() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let transaction = transfer(&sender_wallet, &recipient_wallet, value);

            assert!(matches!(
                transaction.sign(&sender_wallet),
                Err(TransactionError::InvalidAmount(_))
            ));
            assert!(matches!(
                transaction.sign_with_key(sender_wallet.signing_key()),
                Err(TransactionError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_sign_with_foreign_wallet() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();
        let transaction = transfer(&sender_wallet, &recipient_wallet, 1.0);

        assert!(matches!(
            transaction.sign(&recipient_wallet),
            Err(TransactionError::InvalidSenderAddress(_))
        ));
    }
}
