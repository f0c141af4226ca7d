// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wire definitions for the air-gapped signer
//!
//! Everything that crosses the air gap is defined here: the QR frame format used
//! to split payloads over one or more codes ([qr]), the prelude identifying a
//! scanned signing request ([prelude]), SCALE compact integers used throughout
//! request bodies ([compact]), and the session state tags and rolling digest
//! shared between the engine and any front-end driving it ([state]).
//!
//! Fixed-width integers are little-endian, matching the SCALE encoding of the
//! payloads carried inside frames.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod compact;
pub mod digest;
pub mod prelude;
pub mod qr;
pub mod state;

mod helpers;

pub use prelude::{Encryption, PayloadKind, Prelude};

/// Wire protocol version, bumped on incompatible frame or prelude changes
pub const PROTO_VERSION: u8 = 0x01;

/// Protocol encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Buffer too short for the encoded object
    #[cfg_attr(feature = "thiserror", error("invalid length"))]
    InvalidLength = 0x00,

    /// Object could not be decoded
    #[cfg_attr(feature = "thiserror", error("invalid encoding"))]
    InvalidEncoding = 0x01,

    /// Compact integer is not canonically encoded or overflows
    #[cfg_attr(feature = "thiserror", error("invalid compact integer"))]
    InvalidCompact = 0x02,

    /// Frame header is malformed or inconsistent with earlier frames
    #[cfg_attr(feature = "thiserror", error("invalid frame"))]
    InvalidFrame = 0x10,

    /// Not every frame of a multi-frame sequence has been received
    #[cfg_attr(feature = "thiserror", error("incomplete frame sequence"))]
    IncompleteSequence = 0x11,

    /// Reassembled payload does not match its trailing checksum
    #[cfg_attr(feature = "thiserror", error("checksum mismatch"))]
    ChecksumMismatch = 0x12,

    /// Payload too large to be split into frames
    #[cfg_attr(feature = "thiserror", error("payload too large"))]
    PayloadTooLarge = 0x13,

    /// Unsupported frame capacity
    #[cfg_attr(feature = "thiserror", error("frame capacity too small"))]
    InvalidCapacity = 0x14,

    /// Unknown prelude / payload kind
    #[cfg_attr(feature = "thiserror", error("unrecognised payload prelude"))]
    InvalidPrelude = 0x20,
}

impl From<encdec::Error> for Error {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => Error::InvalidLength,
            _ => Error::InvalidEncoding,
        }
    }
}
