// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session state tags and rolling session digest
//!

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use sha2::{Digest as _, Sha512_256};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::Error;

/// Session state enumeration, exposed to front-ends so every
/// renderer agrees on what the engine is currently doing
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum StateTag {
    Idle = 0x00,
    AwaitingScan = 0x10,
    Decoding = 0x11,
    ReviewingTransaction = 0x20,
    AwaitingAuthentication = 0x21,
    Signed = 0x30,
    SeedNaming = 0x40,
    SeedPhraseEntry = 0x41,
    ReviewingSeedFlow = 0x42,
    AwaitingExportAuth = 0x43,
    Error = 0xFF,
}

impl StateTag {
    /// Terminal states only accept a reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, StateTag::Signed | StateTag::Error)
    }
}

impl Encode for StateTag {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.is_empty() {
            return Err(Error::InvalidLength);
        }
        buff[0] = *self as u8;
        Ok(1)
    }
}

impl DecodeOwned for StateTag {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        if buff.is_empty() {
            return Err(Error::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(Error::InvalidEncoding),
        }
    }
}

/// Session digest, a running hash over every accepted action so that
/// multiple front-ends driving one session can detect divergence.
#[derive(Clone, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Create a new (empty) session digest
    pub const fn new() -> Self {
        Self([0u8; 32])
    }

    /// Fetch digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Update session digest with the hash of an accepted action
    pub fn update(&mut self, action: &[u8; 32]) -> &Self {
        let mut d = Sha512_256::new();

        // Prior state
        d.update(self.0);

        // New action
        d.update(action);

        self.0.copy_from_slice(d.finalize().as_ref());

        self
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug format [Digest] as hex
impl core::fmt::Debug for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

/// Display [Digest] as hex
impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in &self.0[..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Encode for Digest {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(32)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        crate::helpers::arr::enc(&self.0, buff)
    }
}

/// Decode [Digest] into owned array
impl DecodeOwned for Digest {
    type Output = Digest;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 32 {
            return Err(Error::InvalidLength);
        }

        let mut d = [0u8; 32];
        d.copy_from_slice(&buff[..32]);
        Ok((Self(d), 32))
    }
}
