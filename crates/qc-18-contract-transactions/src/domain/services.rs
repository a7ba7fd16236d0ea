//! # Domain Services
//!
//! Pure hashing and encoding helpers. Deterministic, no side effects.

use crate::domain::identity::UserId;
use crate::domain::value_objects::{KeyHash, PublicKey, RegId, TxHash};
use sha3::{Digest, Keccak256};

/// Computes the Keccak-256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Key hash of an owner public key: last 20 bytes of its Keccak-256.
#[must_use]
pub fn public_key_hash(pk: &PublicKey) -> KeyHash {
    truncate_to_key_hash(&keccak256(pk.as_bytes()))
}

/// Key hash of the contract account registered at `reg_id`.
///
/// Pure in `(height, index)`, so distinct deploy positions never collide.
#[must_use]
pub fn contract_key_hash(reg_id: &RegId) -> KeyHash {
    truncate_to_key_hash(&keccak256(&reg_id.to_raw()))
}

fn truncate_to_key_hash(digest: &[u8; 32]) -> KeyHash {
    let mut key = [0u8; 20];
    key.copy_from_slice(&digest[12..]);
    KeyHash::new(key)
}

// =============================================================================
// CANONICAL PAYLOAD ENCODING
// =============================================================================

/// Little-endian, length-prefixed writer for signing payloads.
///
/// Every transaction field except the signature goes through here, so the
/// transaction hash and the signed bytes always agree.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single byte.
    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    /// Appends a little-endian u32.
    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a little-endian u64.
    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a u32 length prefix followed by the bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        // Payload sizes are bounded by config limits far below u32::MAX.
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.put_u32(len);
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends a tagged identity.
    pub fn put_user_id(&mut self, id: &UserId) -> &mut Self {
        match id {
            UserId::RegId(reg_id) => {
                self.put_u8(0x01).put_bytes(&reg_id.to_raw());
            }
            UserId::PubKey(pk) => {
                self.put_u8(0x02).put_bytes(pk.as_bytes());
            }
            UserId::KeyHash(key) => {
                self.put_u8(0x03).put_bytes(key.as_bytes());
            }
            UserId::Address(addr) => {
                self.put_u8(0x04).put_bytes(addr.as_bytes());
            }
        }
        self
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Hash of a signing payload.
#[must_use]
pub fn payload_hash(payload: &[u8]) -> TxHash {
    TxHash::new(keccak256(payload))
}
