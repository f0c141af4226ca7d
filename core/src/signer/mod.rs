// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing and verification
//!
//! - sr25519 signs under the `substrate` context with a deterministic nonce
//! - ed25519 signs per RFC 8032
//! - ecdsa signs the BLAKE2b-256 hash of the message, producing a
//!   recoverable `r | s | v` signature

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::{RecoveryId, VerifyingKey};

use crate::{
    helpers::{blake2_256, sign_sr25519},
    vault::{KeyPair, MultiSigner, Signature},
};

/// sr25519 signing context
pub const SR25519_CONTEXT: &[u8] = b"substrate";

/// Signing errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum SignError {
    #[error("sr25519 signing failed")]
    Sr25519,
    #[error("ecdsa signing failed")]
    Ecdsa,
}

/// Sign a message, the algorithm is selected by the key scheme
pub fn sign(key: &KeyPair, message: &[u8]) -> Result<Signature, SignError> {
    let s = match key {
        KeyPair::Sr25519(k) => {
            let s = sign_sr25519(k, SR25519_CONTEXT, message).map_err(|_| SignError::Sr25519)?;
            Signature::Sr25519(s)
        }
        KeyPair::Ed25519(k) => Signature::Ed25519(k.sign(message).to_bytes()),
        KeyPair::Ecdsa(k) => {
            let h = blake2_256(message);
            let (sig, recid) = k
                .sign_prehash_recoverable(&h)
                .map_err(|_| SignError::Ecdsa)?;

            let mut s = [0u8; 65];
            s[..64].copy_from_slice(&sig.to_bytes());
            s[64] = recid.to_byte();
            Signature::Ecdsa(s)
        }
    };

    #[cfg(feature = "log")]
    log::debug!("signed {} byte message with {}", message.len(), key.public());

    Ok(s)
}

/// Verify a signature against a public key
pub fn verify(public: &MultiSigner, message: &[u8], signature: &Signature) -> bool {
    match (public, signature) {
        (MultiSigner::Sr25519(p), Signature::Sr25519(s)) => {
            let (p, s) = match (
                schnorrkel::PublicKey::from_bytes(p),
                schnorrkel::Signature::from_bytes(s),
            ) {
                (Ok(p), Ok(s)) => (p, s),
                _ => return false,
            };
            p.verify_simple(SR25519_CONTEXT, message, &s).is_ok()
        }
        (MultiSigner::Ed25519(p), Signature::Ed25519(s)) => {
            let p = match ed25519_dalek::VerifyingKey::from_bytes(p) {
                Ok(p) => p,
                Err(_) => return false,
            };
            p.verify(message, &ed25519_dalek::Signature::from_bytes(s))
                .is_ok()
        }
        (MultiSigner::Ecdsa(p), Signature::Ecdsa(s)) => {
            let (sig, recid) = match (
                k256::ecdsa::Signature::from_slice(&s[..64]),
                RecoveryId::from_byte(s[64]),
            ) {
                (Ok(sig), Some(recid)) => (sig, recid),
                _ => return false,
            };

            let h = blake2_256(message);
            match VerifyingKey::recover_from_prehash(&h, &sig, recid) {
                Ok(k) => k.to_encoded_point(true).as_bytes() == &p[..],
                Err(_) => false,
            }
        }
        _ => false,
    }
}
