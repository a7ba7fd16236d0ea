//! # Value Objects
//!
//! Immutable ledger primitives: key hashes, registration ids, public keys and
//! transaction hashes. These types are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height as packed into a [`RegId`].
pub type BlockHeight = u32;

/// Position of a transaction inside its block.
pub type TxIndex = u16;

/// Unsigned fixed-point amount in minor units.
pub type Amount = u64;

// =============================================================================
// KEY HASH (20 bytes)
// =============================================================================

/// Canonical 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct KeyHash(pub [u8; 20]);

impl KeyHash {
    /// The null key hash. Never a valid account.
    pub const NULL: Self = Self([0u8; 20]);

    /// Creates a key hash from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates a key hash from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the null key hash.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyHash({})", self.to_hex())
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// TRANSACTION HASH (32 bytes)
// =============================================================================

/// A 32-byte transaction hash (Keccak-256 of the signing payload).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[28..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// =============================================================================
// REGISTRATION ID
// =============================================================================

/// Compact identifier assigned at an account's first on-chain commitment.
///
/// Derived from the block height and the transaction index inside that block,
/// so it is unique across chain history.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RegId {
    /// Height of the registering block.
    pub height: BlockHeight,
    /// Index of the registering transaction.
    pub index: TxIndex,
}

impl RegId {
    /// Length of the packed raw form.
    pub const RAW_LEN: usize = 6;

    /// Creates a registration id.
    #[must_use]
    pub const fn new(height: BlockHeight, index: TxIndex) -> Self {
        Self { height, index }
    }

    /// Packs into 4-byte LE height followed by 2-byte LE index.
    #[must_use]
    pub fn to_raw(&self) -> [u8; Self::RAW_LEN] {
        let mut raw = [0u8; Self::RAW_LEN];
        raw[..4].copy_from_slice(&self.height.to_le_bytes());
        raw[4..].copy_from_slice(&self.index.to_le_bytes());
        raw
    }

    /// Unpacks the raw form. Returns None if wrong length.
    #[must_use]
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        if raw.len() != Self::RAW_LEN {
            return None;
        }
        let height = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let index = u16::from_le_bytes([raw[4], raw[5]]);
        Some(Self { height, index })
    }

    /// The genesis placeholder `0-0` is never assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height == 0 && self.index == 0
    }
}

impl fmt::Debug for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegId({}-{})", self.height, self.index)
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

// =============================================================================
// PUBLIC KEY
// =============================================================================

/// SEC1-encoded secp256k1 public key as carried in transactions.
///
/// Structural validity is checked by the
/// [`SignatureVerifier`](crate::ports::SignatureVerifier), not here.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    /// Length of a compressed SEC1 point.
    pub const COMPRESSED_LEN: usize = 33;

    /// Wraps raw SEC1 bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

// =============================================================================
// TRANSACTION LOCATION
// =============================================================================

/// Where a transaction landed on chain. Entry of the address history index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLocation {
    /// Block height.
    pub height: BlockHeight,
    /// Index inside the block.
    pub index: TxIndex,
    /// Transaction hash.
    pub tx_hash: TxHash,
}
