// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hashing and display helpers

use blake2::{digest::consts::U32, Blake2b, Blake2b512, Digest};

mod schnorrkel;
pub(crate) use self::schnorrkel::sign_sr25519;

/// BLAKE2b with 256-bit output
type Blake2b256 = Blake2b<U32>;

/// Compute the BLAKE2b-256 hash of the provided data
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut h = [0u8; 32];
    h.copy_from_slice(&Blake2b256::digest(data));
    h
}

/// Encode a public key as an SS58 address with the provided network prefix
pub fn ss58_encode(prefix: u16, key: &[u8]) -> String {
    let mut v = Vec::with_capacity(key.len() + 4);

    // One byte prefix for 0..64, two byte prefix otherwise
    match prefix {
        0..=63 => v.push(prefix as u8),
        _ => {
            v.push((((prefix & 0b1111_1100) >> 2) as u8) | 0b0100_0000);
            v.push(((prefix >> 8) as u8) | (((prefix & 0b11) as u8) << 6));
        }
    }
    v.extend_from_slice(key);

    let h = Blake2b512::new()
        .chain_update(b"SS58PRE")
        .chain_update(&v)
        .finalize();
    v.extend_from_slice(&h[..2]);

    bs58::encode(v).into_string()
}

/// Format helper for balances with network decimals and unit
pub fn fmt_balance(value: u128, decimals: u8, unit: &str) -> String {
    let digits = decimals as usize;

    let v = match 10u128.checked_pow(decimals as u32) {
        Some(scalar) => {
            let whole = value / scalar;
            let frac = value % scalar;

            match frac {
                0 => format!("{whole}"),
                _ => {
                    let f = format!("{frac:0digits$}");
                    format!("{whole}.{}", f.trim_end_matches('0'))
                }
            }
        }
        // Every u128 is below the scalar
        None if value == 0 => "0".to_string(),
        None => {
            let f = format!("{value:0digits$}");
            format!("0.{}", f.trim_end_matches('0'))
        }
    };

    match unit.is_empty() {
        true => v,
        false => format!("{v} {unit}"),
    }
}

/// Render bytes as `0x` prefixed hex
pub fn fmt_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(2 + data.len() * 2);
    s.push_str("0x");
    for b in data {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
