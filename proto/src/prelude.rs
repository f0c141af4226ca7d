// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request prelude and response objects
//!
//! Every payload scanned by the signer starts with a three byte prelude
//! identifying the signature scheme and the kind of request that follows.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  MAGIC (0x53) |   ENCRYPTION  |      KIND     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Request bodies by kind:
//! ```text
//! TRANSACTION:   PUBLIC_KEY | COMPACT(LEN) | CALL | EXTENSIONS | GENESIS_HASH
//! MESSAGE:       PUBLIC_KEY | COMPACT(LEN) | MESSAGE | GENESIS_HASH
//! LOAD_METADATA: GENESIS_HASH | METADATA
//! ```

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

use crate::{helpers::arr, Error};

/// Prelude magic byte
pub const PRELUDE_MAGIC: u8 = 0x53;

/// Encoded prelude length
pub const PRELUDE_LEN: usize = 3;

/// Signature scheme for a request
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Encryption {
    Ed25519 = 0x00,
    Sr25519 = 0x01,
    Ecdsa = 0x02,
    /// Unsigned payloads (metadata updates)
    Unsigned = 0xff,
}

impl Encryption {
    /// Public key length for this scheme
    pub const fn public_key_len(&self) -> usize {
        match self {
            Encryption::Ed25519 | Encryption::Sr25519 => 32,
            Encryption::Ecdsa => 33,
            Encryption::Unsigned => 0,
        }
    }

    /// Signature length for this scheme
    pub const fn signature_len(&self) -> usize {
        match self {
            Encryption::Ed25519 | Encryption::Sr25519 => 64,
            Encryption::Ecdsa => 65,
            Encryption::Unsigned => 0,
        }
    }
}

impl Encode for Encryption {
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

impl DecodeOwned for Encryption {
    type Output = Self;
    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        if buff.is_empty() {
            return Err(Error::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(Error::InvalidPrelude),
        }
    }
}

/// Request kind
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum PayloadKind {
    /// Signable transaction
    Transaction = 0x02,
    /// Arbitrary message for signing
    Message = 0x03,
    /// Network metadata update
    LoadMetadata = 0x80,
}

/// Request prelude, see [module docs][self] for encoding
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Prelude {
    pub encryption: Encryption,
    pub kind: PayloadKind,
}

impl Prelude {
    /// Create a new prelude
    pub const fn new(encryption: Encryption, kind: PayloadKind) -> Self {
        Self { encryption, kind }
    }

    /// Check the encryption is valid for the request kind
    pub fn is_consistent(&self) -> bool {
        match self.kind {
            PayloadKind::LoadMetadata => self.encryption == Encryption::Unsigned,
            _ => self.encryption != Encryption::Unsigned,
        }
    }
}

impl Encode for Prelude {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(PRELUDE_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < PRELUDE_LEN {
            return Err(Error::InvalidLength);
        }

        buff[0] = PRELUDE_MAGIC;
        buff[1] = self.encryption as u8;
        buff[2] = self.kind as u8;

        Ok(PRELUDE_LEN)
    }
}

impl DecodeOwned for Prelude {
    type Output = Self;
    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        if buff.len() < PRELUDE_LEN {
            return Err(Error::InvalidLength);
        }
        if buff[0] != PRELUDE_MAGIC {
            return Err(Error::InvalidPrelude);
        }

        let (encryption, _) = Encryption::decode_owned(&buff[1..])?;
        let kind = PayloadKind::try_from(buff[2]).map_err(|_| Error::InvalidPrelude)?;

        let p = Self { encryption, kind };
        if !p.is_consistent() {
            return Err(Error::InvalidPrelude);
        }

        Ok((p, PRELUDE_LEN))
    }
}

/// Metadata update header, follows the prelude of [PayloadKind::LoadMetadata] requests
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                         GENESIS_HASH                          /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "Error")]
pub struct MetadataHeader {
    /// Network genesis hash the metadata applies to
    #[encdec(with = "arr")]
    pub genesis_hash: [u8; 32],
}

/// Signature response, returned over QR once a request is approved
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   ENCRYPTION  |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                     SIGNATURE (64 or 65 bytes)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SignatureResponse<'a> {
    pub encryption: Encryption,
    pub signature: &'a [u8],
}

impl<'a> Encode for SignatureResponse<'a> {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(1 + self.signature.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(Error::InvalidLength);
        }

        let mut index = self.encryption.encode(buff)?;
        buff[index..][..self.signature.len()].copy_from_slice(self.signature);
        index += self.signature.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignatureResponse<'a> {
    type Output = Self;
    type Error = Error;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), Error> {
        let (encryption, index) = Encryption::decode_owned(buff)?;

        let n = encryption.signature_len();
        if n == 0 {
            return Err(Error::InvalidEncoding);
        }
        let signature = buff.get(index..index + n).ok_or(Error::InvalidLength)?;

        Ok((
            Self {
                encryption,
                signature,
            },
            index + n,
        ))
    }
}
