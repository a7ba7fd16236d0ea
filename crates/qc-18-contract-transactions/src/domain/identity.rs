//! # Identity Resolution
//!
//! Account identifiers come in four forms. [`UserId`] is the tagged variant
//! carried by transactions; [`resolve_user_id_bytes`] handles the raw
//! identifiers a contract hands back for the sub-accounts it touched.
//!
//! ## Textual addresses
//!
//! An address is `"qc"` followed by the 32-character lowercase base32
//! (RFC 4648 alphabet, no padding) encoding of the 20-byte key hash, which
//! makes every address exactly [`ADDRESS_LEN`] bytes long.

use crate::domain::services::public_key_hash;
use crate::domain::value_objects::{KeyHash, PublicKey, RegId};
use crate::errors::IdentityError;
use crate::ports::outbound::AccountStore;
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte length of a textual address.
pub const ADDRESS_LEN: usize = 34;

/// Prefix of every textual address.
pub const ADDRESS_PREFIX: &str = "qc";

// =============================================================================
// USER ID
// =============================================================================

/// External account identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserId {
    /// Registration id assigned at first commitment.
    RegId(RegId),
    /// Owner public key.
    PubKey(PublicKey),
    /// Canonical key hash.
    KeyHash(KeyHash),
    /// Textual address.
    Address(String),
}

impl UserId {
    /// Short name of the identity form, used in rejection messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegId(_) => "regid",
            Self::PubKey(_) => "pubkey",
            Self::KeyHash(_) => "keyhash",
            Self::Address(_) => "address",
        }
    }

    /// Returns the registration id if this is the `RegId` form.
    #[must_use]
    pub fn as_reg_id(&self) -> Option<&RegId> {
        match self {
            Self::RegId(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the public key if this is the `PubKey` form.
    #[must_use]
    pub fn as_pub_key(&self) -> Option<&PublicKey> {
        match self {
            Self::PubKey(pk) => Some(pk),
            _ => None,
        }
    }

    /// Resolves to a key hash without consulting any store.
    ///
    /// Registration ids need the account index and yield `None` here.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::BadAddress`] for undecodable address text.
    pub fn direct_key_hash(&self) -> Result<Option<KeyHash>, IdentityError> {
        match self {
            Self::RegId(_) => Ok(None),
            Self::PubKey(pk) => Ok(Some(public_key_hash(pk))),
            Self::KeyHash(key) => Ok(Some(*key)),
            Self::Address(addr) => decode_address(addr).map(Some),
        }
    }

    /// Resolves to a non-null key hash via the account store.
    ///
    /// # Errors
    ///
    /// [`IdentityError::EmptyIdentity`] when nothing (or the null hash) is
    /// found, or the underlying store error.
    pub fn resolve<S: AccountStore + ?Sized>(&self, store: &S) -> Result<KeyHash, IdentityError> {
        let key = store.get_key_hash(self)?.unwrap_or(KeyHash::NULL);
        if key.is_null() {
            return Err(IdentityError::EmptyIdentity);
        }
        Ok(key)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId::{}({self})", self.kind())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegId(id) => write!(f, "{id}"),
            Self::PubKey(pk) => f.write_str(&pk.to_hex()),
            Self::KeyHash(key) => write!(f, "{key}"),
            Self::Address(addr) => f.write_str(addr),
        }
    }
}

impl From<RegId> for UserId {
    fn from(id: RegId) -> Self {
        Self::RegId(id)
    }
}

impl From<KeyHash> for UserId {
    fn from(key: KeyHash) -> Self {
        Self::KeyHash(key)
    }
}

impl From<PublicKey> for UserId {
    fn from(pk: PublicKey) -> Self {
        Self::PubKey(pk)
    }
}

// =============================================================================
// RAW IDENTIFIER RESOLUTION
// =============================================================================

/// Resolves a raw identifier handed back by the VM.
///
/// A 6-byte identifier is a packed [`RegId`] looked up in the account index;
/// a 34-byte identifier is a textual address decoded directly.
///
/// # Errors
///
/// - [`IdentityError::InvalidFormat`] for any other length
/// - [`IdentityError::EmptyIdentity`] if the result is the null key hash
pub fn resolve_user_id_bytes<S: AccountStore + ?Sized>(
    store: &S,
    raw: &[u8],
) -> Result<KeyHash, IdentityError> {
    let key = match raw.len() {
        RegId::RAW_LEN => {
            let reg_id =
                RegId::from_raw(raw).ok_or(IdentityError::InvalidFormat { len: raw.len() })?;
            store
                .get_key_hash(&UserId::RegId(reg_id))?
                .unwrap_or(KeyHash::NULL)
        }
        ADDRESS_LEN => {
            let text = std::str::from_utf8(raw)
                .map_err(|_| IdentityError::BadAddress("address is not utf-8".to_string()))?;
            decode_address(text)?
        }
        len => return Err(IdentityError::InvalidFormat { len }),
    };

    if key.is_null() {
        return Err(IdentityError::EmptyIdentity);
    }
    Ok(key)
}

// =============================================================================
// ADDRESS CODEC
// =============================================================================

/// Encodes a key hash as a textual address.
#[must_use]
pub fn encode_address(key: &KeyHash) -> String {
    let body = BASE32_NOPAD.encode(key.as_bytes()).to_ascii_lowercase();
    format!("{ADDRESS_PREFIX}{body}")
}

/// Decodes a textual address into its key hash.
///
/// # Errors
///
/// [`IdentityError::BadAddress`] on wrong length, prefix or alphabet.
pub fn decode_address(addr: &str) -> Result<KeyHash, IdentityError> {
    if addr.len() != ADDRESS_LEN {
        return Err(IdentityError::BadAddress(format!(
            "expected {ADDRESS_LEN} bytes, got {}",
            addr.len()
        )));
    }
    let body = addr
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or_else(|| IdentityError::BadAddress(format!("missing '{ADDRESS_PREFIX}' prefix")))?;

    // Addresses are canonical lowercase.
    if body.bytes().any(|c| c.is_ascii_uppercase()) {
        return Err(IdentityError::BadAddress("address must be lowercase".to_string()));
    }
    let bytes = BASE32_NOPAD
        .decode(body.to_ascii_uppercase().as_bytes())
        .map_err(|e| IdentityError::BadAddress(e.to_string()))?;
    KeyHash::from_slice(&bytes)
        .ok_or_else(|| IdentityError::BadAddress(format!("decoded {} bytes", bytes.len())))
}
