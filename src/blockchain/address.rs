use p256::ecdsa::VerifyingKey;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use std::fmt;

use super::crypto::public_key_coordinates;

/// Version byte prepended to the public key hash
const VERSION: u8 = 0x00;

/// Length of the checksum appended to the versioned hash
const CHECKSUM_LEN: usize = 4;

/// Length of the decoded address payload: version, 20-byte hash, checksum
const PAYLOAD_LEN: usize = 1 + 20 + CHECKSUM_LEN;

/// Represents a blockchain address (Base58Check of the public key hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Address(pub String);

impl Address {
    /// Derives the address of a public key
    ///
    /// The key's X and Y coordinates are hashed as minimal big-endian byte
    /// strings, without padding to the field width. Keys whose coordinates
    /// start with a zero byte therefore hash fewer than 64 bytes; existing
    /// addresses depend on this.
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let (x, y) = public_key_coordinates(public_key);

        let mut hasher = Sha256::new();
        hasher.update(&x);
        hasher.update(&y);
        let key_digest = hasher.finalize();

        let key_hash = Ripemd160::digest(key_digest);

        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(VERSION);
        payload.extend_from_slice(&key_hash);

        let checksum = checksum(&payload);
        payload.extend_from_slice(&checksum);

        Address(bs58::encode(payload).into_string())
    }

    /// Checks that the address decodes to a versioned hash with a matching
    /// checksum
    pub fn has_valid_checksum(&self) -> bool {
        let payload = match bs58::decode(&self.0).into_vec() {
            Ok(payload) => payload,
            Err(_) => return false,
        };

        if payload.len() != PAYLOAD_LEN || payload[0] != VERSION {
            return false;
        }

        let (versioned, expected) = payload.split_at(PAYLOAD_LEN - CHECKSUM_LEN);
        checksum(versioned) == expected
    }
}

/// First four bytes of SHA-256(SHA-256(data))
fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; CHECKSUM_LEN];
    result.copy_from_slice(&second[..CHECKSUM_LEN]);
    result
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}
