//! # secp256k1 Signature Adapter
//!
//! Verifies compact (64-byte `r || s`) ECDSA signatures over the signing
//! payload. High-S signatures are refused by `k256` itself.

use crate::domain::value_objects::PublicKey;
use crate::ports::outbound::SignatureVerifier;
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use tracing::trace;

/// `k256`-backed [`SignatureVerifier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Verifier;

impl Secp256k1Verifier {
    /// Creates the verifier.
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn is_valid_public_key(&self, pk: &PublicKey) -> bool {
        pk.as_bytes().len() == PublicKey::COMPRESSED_LEN
            && VerifyingKey::from_sec1_bytes(pk.as_bytes()).is_ok()
    }

    fn verify(&self, pk: &PublicKey, payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(pk.as_bytes()) else {
            trace!(pk = %pk.to_hex(), "public key does not parse");
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            trace!(len = signature.len(), "signature does not parse");
            return false;
        };
        key.verify(payload, &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[7u8; 32]).unwrap()
    }

    fn public_key(key: &SigningKey) -> PublicKey {
        PublicKey::from_bytes(key.verifying_key().to_sec1_bytes().to_vec())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let key = signing_key();
        let sig: Signature = key.sign(b"payload");
        let verifier = Secp256k1Verifier::new();
        assert!(verifier.verify(&public_key(&key), b"payload", &sig.to_bytes()));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let key = signing_key();
        let sig: Signature = key.sign(b"payload");
        let verifier = Secp256k1Verifier::new();
        assert!(!verifier.verify(&public_key(&key), b"payloaD", &sig.to_bytes()));
        assert!(!verifier.verify(&public_key(&key), b"payload", &[0u8; 10]));
    }

    #[test]
    fn test_public_key_validity() {
        let verifier = Secp256k1Verifier::new();
        assert!(verifier.is_valid_public_key(&public_key(&signing_key())));
        // 0x05 is not a SEC1 tag
        let mut bad = vec![2u8; 33];
        bad[0] = 0x05;
        assert!(!verifier.is_valid_public_key(&PublicKey::from_bytes(bad)));
        assert!(!verifier.is_valid_public_key(&PublicKey::from_bytes(vec![0u8; 12])));
    }
}
