use p256::ecdsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

use super::address::Address;

/// Byte length of one P-256 field element
const COORDINATE_LEN: usize = 32;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Failed to sign message: {0}")]
    SigningError(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// An ECDSA signature `(r, s)`, hex encoded as the two 32-byte scalars
/// concatenated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(hex::encode(signature.to_bytes()))
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = hex::decode(&self.0).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        if bytes.len() != 2 * COORDINATE_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                2 * COORDINATE_LEN,
                bytes.len()
            )));
        }

        Signature::from_slice(&bytes).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the public point's affine coordinates as minimal big-endian byte
/// strings (leading zero bytes removed).
pub fn public_key_coordinates(public_key: &VerifyingKey) -> (Vec<u8>, Vec<u8>) {
    let point = public_key.to_encoded_point(false);
    let x = point.x().map(|x| trim_leading_zeros(x)).unwrap_or_default();
    let y = point.y().map(|y| trim_leading_zeros(y)).unwrap_or_default();
    (x, y)
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// Encodes a public key as hex `X || Y`, each coordinate padded to 32 bytes
pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    let point = public_key.to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || X || Y
    hex::encode(&point.as_bytes()[1..])
}

/// Decodes a public key produced by [`public_key_to_hex`]
pub fn public_key_from_hex(encoded: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(encoded).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    if bytes.len() != 2 * COORDINATE_LEN {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            2 * COORDINATE_LEN,
            bytes.len()
        )));
    }

    let mut sec1 = Vec::with_capacity(1 + bytes.len());
    sec1.push(0x04);
    sec1.extend_from_slice(&bytes);

    VerifyingKey::from_sec1_bytes(&sec1).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// ECDSA-signs a 32-byte digest with fresh randomness
pub fn sign_digest(signing_key: &SigningKey, digest: &[u8; 32]) -> Result<DigitalSignature, CryptoError> {
    let signature: Signature = signing_key
        .sign_prehash_with_rng(&mut OsRng, digest)
        .map_err(|e| CryptoError::SigningError(e.to_string()))?;

    Ok(DigitalSignature::from_signature(&signature))
}

/// Verifies a signature against a 32-byte digest and public key
///
/// Returns `Ok(false)` when the signature is well formed but does not match,
/// and an error when the signature cannot be decoded at all.
pub fn verify_digest(
    digest: &[u8; 32],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;

    match public_key.verify_prehash(digest, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Represents a wallet with a P-256 keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Creates a wallet from an existing secret scalar
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret_key_bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;

        Ok(Self::from_signing_key(signing_key))
    }

    /// Creates a wallet from a hex encoded secret scalar
    pub fn from_private_key_hex(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(encoded).map_err(|e| CryptoError::DecodingError(e.to_string()))?;
        Self::from_secret_key(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.verifying_key)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}
