// Copyright (c) 2022-2023 The MobileCoin Foundation

//! QR frame transport
//!
//! Payloads that fit within a single code (and do not begin with the
//! multipart marker) are transferred as raw bytes. Larger payloads have a
//! CRC-32 appended and are split over an animated sequence of frames, each
//! carrying a [FrameHeader].
//!
//! ## Multipart frame encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | MARKER (0x00) |          FRAME_INDEX          |  FRAME_COUNT  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  FRAME_COUNT  |                                               |
//! +-+-+-+-+-+-+-+-+                                               +
//! /                          FRAME_DATA                           /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Concatenating `FRAME_DATA` in index order yields `PAYLOAD | CRC32 (LE)`.

use alloc::{collections::BTreeMap, vec::Vec};

use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_ISO_HDLC};
use encdec::{Decode, Encode};

use crate::Error;

/// Binary capacity of a version 40 QR code at the lowest error correction level
pub const DEFAULT_FRAME_CAPACITY: usize = 2953;

/// First byte of every multipart frame
pub const MULTIPART_MARKER: u8 = 0x00;

/// Multipart frame header length
pub const FRAME_HEADER_LEN: usize = 5;

const CHECKSUM_LEN: usize = 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Multipart frame header, see [module docs][self] for encoding
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "Error")]
pub struct FrameHeader {
    pub marker: u8,
    pub index: u16,
    pub count: u16,
}

impl FrameHeader {
    pub const fn new(index: u16, count: u16) -> Self {
        Self {
            marker: MULTIPART_MARKER,
            index,
            count,
        }
    }
}

/// Frame reception progress
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Progress {
    pub received: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.received == self.total
    }
}

/// Split a payload into one or more frames of at most `capacity` bytes
pub fn encode(payload: &[u8], capacity: usize) -> Result<Vec<Vec<u8>>, Error> {
    if capacity <= FRAME_HEADER_LEN {
        return Err(Error::InvalidCapacity);
    }

    // Raw single frame where possible
    if !payload.is_empty() && payload.len() <= capacity && payload[0] != MULTIPART_MARKER {
        return Ok(alloc::vec![payload.to_vec()]);
    }

    // Otherwise append checksum and split
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&CRC32.checksum(payload).to_le_bytes());

    let chunk_len = capacity - FRAME_HEADER_LEN;
    let count = (data.len() + chunk_len - 1) / chunk_len;
    let count = u16::try_from(count).map_err(|_| Error::PayloadTooLarge)?;

    let mut frames = Vec::with_capacity(count as usize);
    for (i, chunk) in data.chunks(chunk_len).enumerate() {
        let h = FrameHeader::new(i as u16, count);

        let mut f = alloc::vec![0u8; FRAME_HEADER_LEN + chunk.len()];
        let n = h.encode(&mut f)?;
        f[n..].copy_from_slice(chunk);

        frames.push(f);
    }

    Ok(frames)
}

/// Reassemble a payload from a complete set of frames (in any order)
pub fn decode<F: AsRef<[u8]>>(frames: &[F]) -> Result<Vec<u8>, Error> {
    let mut c = FrameCollector::new();
    for f in frames {
        c.push(f.as_ref())?;
    }
    c.finish()
}

/// Streaming frame collector, accepts frames as they are scanned
#[derive(Clone, Debug, Default)]
pub struct FrameCollector {
    single: Option<Vec<u8>>,
    total: Option<u16>,
    frames: BTreeMap<u16, Vec<u8>>,
}

impl FrameCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scanned frame, returning updated progress.
    ///
    /// Duplicate frames are ignored (the first copy is retained), frames
    /// inconsistent with those already received are rejected.
    pub fn push(&mut self, frame: &[u8]) -> Result<Progress, Error> {
        let first = *frame.first().ok_or(Error::InvalidFrame)?;

        // Single frame payload
        if first != MULTIPART_MARKER {
            match &self.single {
                _ if self.total.is_some() => return Err(Error::InvalidFrame),
                Some(s) if s.as_slice() != frame => return Err(Error::InvalidFrame),
                Some(_) => (),
                None => self.single = Some(frame.to_vec()),
            }
            return Ok(self.progress());
        }

        if self.single.is_some() {
            return Err(Error::InvalidFrame);
        }

        let (h, n) = FrameHeader::decode(frame).map_err(|_| Error::InvalidFrame)?;

        if h.count == 0 || h.index >= h.count {
            return Err(Error::InvalidFrame);
        }
        match self.total {
            Some(t) if t != h.count => return Err(Error::InvalidFrame),
            _ => self.total = Some(h.count),
        }

        self.frames
            .entry(h.index)
            .or_insert_with(|| frame[n..].to_vec());

        #[cfg(feature = "log")]
        log::debug!("frame {}/{} ({} received)", h.index, h.count, self.frames.len());

        Ok(self.progress())
    }

    /// Fetch reception progress
    pub fn progress(&self) -> Progress {
        match (&self.single, self.total) {
            (Some(_), _) => Progress {
                received: 1,
                total: 1,
            },
            (None, Some(t)) => Progress {
                received: self.frames.len(),
                total: t as usize,
            },
            (None, None) => Progress::default(),
        }
    }

    /// Check whether every frame has been received
    pub fn is_complete(&self) -> bool {
        self.progress().is_complete()
    }

    /// Reassemble and verify the payload
    pub fn finish(&self) -> Result<Vec<u8>, Error> {
        if let Some(s) = &self.single {
            return Ok(s.clone());
        }

        let total = self.total.ok_or(Error::IncompleteSequence)?;
        if self.frames.len() != total as usize {
            return Err(Error::IncompleteSequence);
        }

        // BTreeMap iterates in index order
        let mut data: Vec<u8> = self.frames.values().flatten().copied().collect();
        if data.len() < CHECKSUM_LEN {
            return Err(Error::ChecksumMismatch);
        }

        let payload_len = data.len() - CHECKSUM_LEN;
        let expected = LittleEndian::read_u32(&data[payload_len..]);
        data.truncate(payload_len);

        if CRC32.checksum(&data) != expected {
            return Err(Error::ChecksumMismatch);
        }

        Ok(data)
    }

    /// Clear any received frames
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
