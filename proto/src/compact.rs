// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SCALE compact integers
//!
//! Used for length prefixes, nonces, tips and any field declared `Compact<T>`.
//!
//! ## Encoding:
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |MODE |  VALUE  |   MODE 0b00: single byte, value < 2^6
//! +-+-+-+-+-+-+-+-+   MODE 0b01: two bytes (LE), value < 2^14
//!                     MODE 0b10: four bytes (LE), value < 2^30
//!                     MODE 0b11: upper six bits hold (N - 4), followed
//!                                by N little-endian value bytes
//! ```
//!
//! Decoding only accepts canonical (shortest) encodings.

use alloc::vec::Vec;

use encdec::{DecodeOwned, Encode};

use crate::Error;

const MAX_SINGLE: u128 = (1 << 6) - 1;
const MAX_TWO: u128 = (1 << 14) - 1;
const MAX_FOUR: u128 = (1 << 30) - 1;

/// Compact-encoded integer wrapper
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Compact(pub u128);

/// Compute the encoded length of a compact integer
pub fn compact_len(v: u128) -> usize {
    match v {
        0..=MAX_SINGLE => 1,
        0..=MAX_TWO => 2,
        0..=MAX_FOUR => 4,
        _ => 1 + big_len(v),
    }
}

/// Number of little-endian bytes required for a big-mode value
fn big_len(v: u128) -> usize {
    let bits = 128 - v.leading_zeros() as usize;
    ((bits + 7) / 8).max(4)
}

/// Append a compact integer to the provided buffer
pub fn encode_compact(v: u128, out: &mut Vec<u8>) {
    match v {
        0..=MAX_SINGLE => out.push((v as u8) << 2),
        0..=MAX_TWO => out.extend_from_slice(&(((v as u16) << 2) | 0b01).to_le_bytes()),
        0..=MAX_FOUR => out.extend_from_slice(&(((v as u32) << 2) | 0b10).to_le_bytes()),
        _ => {
            let n = big_len(v);
            out.push((((n - 4) as u8) << 2) | 0b11);
            out.extend_from_slice(&v.to_le_bytes()[..n]);
        }
    }
}

/// Decode a compact integer, returning the value and the number of bytes consumed
pub fn decode_compact(buff: &[u8]) -> Result<(u128, usize), Error> {
    let b0 = *buff.first().ok_or(Error::InvalidLength)?;

    match b0 & 0b11 {
        0b00 => Ok(((b0 >> 2) as u128, 1)),
        0b01 => {
            let b = buff.get(..2).ok_or(Error::InvalidLength)?;
            let v = (u16::from_le_bytes([b[0], b[1]]) >> 2) as u128;
            if v <= MAX_SINGLE {
                return Err(Error::InvalidCompact);
            }
            Ok((v, 2))
        }
        0b10 => {
            let b = buff.get(..4).ok_or(Error::InvalidLength)?;
            let v = (u32::from_le_bytes([b[0], b[1], b[2], b[3]]) >> 2) as u128;
            if v <= MAX_TWO {
                return Err(Error::InvalidCompact);
            }
            Ok((v, 4))
        }
        _ => {
            let n = (b0 >> 2) as usize + 4;
            if n > 16 {
                return Err(Error::InvalidCompact);
            }
            let b = buff.get(1..1 + n).ok_or(Error::InvalidLength)?;

            let mut d = [0u8; 16];
            d[..n].copy_from_slice(b);
            let v = u128::from_le_bytes(d);

            // Reject non-minimal encodings
            if v <= MAX_FOUR || b[n - 1] == 0 {
                return Err(Error::InvalidCompact);
            }

            Ok((v, 1 + n))
        }
    }
}

impl Encode for Compact {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(compact_len(self.0))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut v = Vec::with_capacity(17);
        encode_compact(self.0, &mut v);

        let d = buff.get_mut(..v.len()).ok_or(Error::InvalidLength)?;
        d.copy_from_slice(&v);

        Ok(v.len())
    }
}

impl DecodeOwned for Compact {
    type Output = Compact;
    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        decode_compact(buff).map(|(v, n)| (Compact(v), n))
    }
}
