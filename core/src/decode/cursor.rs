// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bounded payload cursor

use core::ops::Range;

use airgap_proto::compact::decode_compact;

use super::{DecodeFailure, DecodeReason};

/// Cursor over a payload, limited to a region that may be narrowed
/// (eg. to the length-prefixed call) and halted once an unknown
/// variant has consumed the rest of the region
pub(crate) struct Cursor<'a> {
    buff: &'a [u8],
    pos: usize,
    end: usize,
    halted: bool,
}

impl<'a> Cursor<'a> {
    pub fn new(buff: &'a [u8]) -> Self {
        Self {
            buff,
            pos: 0,
            end: buff.len(),
            halted: false,
        }
    }

    /// Create a cursor over a region of the payload, offsets remain absolute
    pub fn region(buff: &'a [u8], r: Range<usize>) -> Self {
        let end = r.end.min(buff.len());
        Self {
            buff,
            pos: r.start.min(end),
            end,
            halted: false,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Fetch bytes within the payload by absolute range
    pub fn bytes(&self, r: Range<usize>) -> &'a [u8] {
        self.buff.get(r).unwrap_or(&[])
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Consume the rest of the region and stop decoding it
    pub fn halt(&mut self) -> Range<usize> {
        let r = self.pos..self.end;
        self.pos = self.end;
        self.halted = true;
        r
    }

    pub fn fail(&self, reason: DecodeReason) -> DecodeFailure {
        DecodeFailure::new(reason, self.pos)
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeFailure> {
        if n > self.remaining() {
            return Err(self.fail(DecodeReason::UnexpectedEnd));
        }
        let b = &self.buff[self.pos..][..n];
        self.pos += n;
        Ok(b)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeFailure> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeFailure> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, DecodeFailure> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn compact(&mut self) -> Result<u128, DecodeFailure> {
        let (v, n) = decode_compact(&self.buff[self.pos..self.end]).map_err(|e| match e {
            airgap_proto::Error::InvalidCompact => self.fail(DecodeReason::InvalidCompact),
            _ => self.fail(DecodeReason::UnexpectedEnd),
        })?;
        self.pos += n;
        Ok(v)
    }

    /// Read a compact length prefix, failing where `len * min_size` cannot fit
    /// within the remaining bytes or where zero-sized elements exceed `max_len`
    pub fn length(&mut self, min_size: u64, max_len: u64) -> Result<usize, DecodeFailure> {
        let offset = self.pos;
        let claimed = self.compact()?;
        let remaining = self.remaining();

        let overrun = match min_size {
            0 => claimed > max_len as u128,
            n => claimed.saturating_mul(n as u128) > remaining as u128,
        };
        if overrun {
            return Err(DecodeFailure::new(
                DecodeReason::LengthOverrun { claimed, remaining },
                offset,
            ));
        }

        Ok(claimed as usize)
    }
}
