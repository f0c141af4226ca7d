// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Deterministic sr25519 signing
//!
//! Signatures are derandomised by seeding the transcript RNG from a merlin
//! transcript over the secret scalar, context and message, so the same key
//! and message always produce the same signature.

use merlin::Transcript;
use rand_core::SeedableRng;
use rand_hc::Hc128Rng;
use schnorrkel::{context::attach_rng, Keypair, SecretKey, SignatureError};

// Create a deterministic nonce using a merlin transcript
fn schnorrkel_nonce(scalar: &[u8], context: &[u8], message: &[u8]) -> [u8; 32] {
    let mut transcript = Transcript::new(b"SigningNonce");
    transcript.append_message(b"context", context);
    transcript.append_message(b"private", scalar);
    transcript.append_message(b"message", message);
    let mut nonce = [0u8; 32];
    transcript.challenge_bytes(b"nonce", &mut nonce);
    nonce
}

/// Sign a message under the provided signing context
pub(crate) fn sign_sr25519(
    keypair: &Keypair,
    context: &[u8],
    message: &[u8],
) -> Result<[u8; 64], SignatureError> {
    let mut secret_bytes = keypair.secret.to_bytes();
    let nonce = schnorrkel_nonce(&secret_bytes[..32], context, message);

    // Rebuild the secret key with our nonce in place of the (random) derivation nonce
    secret_bytes[32..].copy_from_slice(&nonce);
    let secret = SecretKey::from_bytes(&secret_bytes);
    zeroize::Zeroize::zeroize(&mut secret_bytes);
    let secret = secret?;

    // SigningContext provides domain separation for signature
    let mut t = Transcript::new(b"SigningContext");
    t.append_message(b"", context);
    t.append_message(b"sign-bytes", message);

    let rng = Hc128Rng::from_seed(nonce);
    let transcript = attach_rng(t, rng);

    Ok(secret.sign(transcript, &keypair.public).to_bytes())
}
