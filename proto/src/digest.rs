// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Helpers for computing action digests
//!
//! Front-ends mirror the session [Digest][crate::state::Digest] by applying the
//! same hashes for every action they submit, so these must stay in sync with
//! the engine. Secret inputs (phrases, authentication proofs) are never hashed,
//! only the fact that the action occurred.

use sha2::{Digest as _, Sha512_256};

/// Hash an action label with optional public data
pub fn digest_action(label: &str, data: &[u8]) -> [u8; 32] {
    Sha512_256::new()
        .chain_update(label)
        .chain_update((data.len() as u32).to_le_bytes())
        .chain_update(data)
        .finalize()
        .into()
}

/// Hash a scanned frame
pub fn digest_scan_frame(frame: &[u8]) -> [u8; 32] {
    digest_action("scan_frame", frame)
}

/// Hash a request for a new seed with the provided word count
pub fn digest_new_seed(words: usize) -> [u8; 32] {
    digest_action("new_seed", &(words as u32).to_le_bytes())
}

/// Hash a seed name entry
pub fn digest_seed_name(name: &str) -> [u8; 32] {
    digest_action("seed_name", name.as_bytes())
}
