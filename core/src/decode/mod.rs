// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SCALE decoding into reviewable cards
//!
//! Payloads are decoded by recursive descent over [RegistryEntry] type
//! descriptors, producing a tree of [Card]s in byte order. Each card records
//! the bytes it consumed itself (discriminants, length prefixes, primitive
//! values), so a pre-order walk of the tree tiles the payload exactly.
//! Unknown variants are shown as such with the remaining bytes of the
//! enclosing region as raw data, structural errors fail with the byte offset
//! at which they were detected.

use core::ops::Range;

use strum::Display;

use crate::registry::{RegistryError, TypeId};

mod cursor;

mod value;
pub use value::decode;

mod request;
pub use request::{
    decode_message, decode_metadata_update, decode_request, decode_transaction, Era, Request,
    Review, SignKind, MAX_UNHASHED_LEN,
};

/// Card kinds
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CardKind {
    Author,
    Network,
    Pallet,
    Method,
    FieldName,
    Composite,
    Tuple,
    Sequence,
    Variant,
    UnknownVariant,
    Bool,
    Char,
    Text,
    Number,
    Balance,
    Id,
    Hash,
    Bytes,
    Raw,
    Era,
    Nonce,
    Tip,
    SpecVersion,
    TxVersion,
    GenesisHash,
    BlockHash,
    Message,
    Metadata,
}

/// Decoded card, one reviewable node of a payload
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Card {
    pub kind: CardKind,
    /// Display value
    pub value: String,
    pub indent: u32,
    /// Start of the bytes consumed by this card
    pub start: usize,
    /// End of the bytes consumed by this card (excluding children)
    pub end: usize,
    pub children: Vec<Card>,
}

impl Card {
    pub fn new(kind: CardKind, value: impl Into<String>, indent: u32, range: Range<usize>) -> Self {
        Self {
            kind,
            value: value.into(),
            indent,
            start: range.start,
            end: range.end,
            children: vec![],
        }
    }

    pub fn with_children(mut self, children: Vec<Card>) -> Self {
        self.children = children;
        self
    }

    /// Bytes consumed by this card alone
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Pre-order walk over this card and its descendants
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Card)) {
        f(self);
        for c in &self.children {
            c.walk(f);
        }
    }
}

/// Ordered card tree for a payload
pub type CardTree = Vec<Card>;

/// Pre-order byte ranges of every card in a tree
pub fn spans(cards: &[Card]) -> Vec<Range<usize>> {
    let mut s = vec![];
    for c in cards {
        c.walk(&mut |c| s.push(c.range()));
    }
    s
}

/// Check the cards of a tree consume `[0, len)` exactly, in order
pub fn covers(cards: &[Card], len: usize) -> bool {
    let mut pos = 0;
    for r in spans(cards) {
        if r.start != pos || r.end < r.start {
            return false;
        }
        pos = r.end;
    }
    pos == len
}

/// Decoder resource limits
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DecoderLimits {
    /// Maximum type nesting depth
    pub max_depth: u32,
    /// Maximum element count for sequences of zero-sized elements
    pub max_sequence_len: u64,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_sequence_len: 65_536,
        }
    }
}

/// Reason a payload failed to decode
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DecodeReason {
    #[error("unexpected end of payload")]
    UnexpectedEnd,
    #[error("length {claimed} overruns remaining {remaining} bytes")]
    LengthOverrun { claimed: u128, remaining: usize },
    #[error("invalid compact integer")]
    InvalidCompact,
    #[error("invalid bool {0:#04x}")]
    InvalidBool(u8),
    #[error("invalid char {0:#x}")]
    InvalidChar(u32),
    #[error("invalid utf-8 string")]
    InvalidUtf8,
    #[error("type nesting too deep")]
    TooDeep,
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("invalid request prelude")]
    InvalidPrelude,
    #[error("unknown type")]
    UnknownType,
    #[error("no metadata for version {requested} (available: {available:?})")]
    VersionMismatch { requested: u32, available: Vec<u32> },
    #[error("unknown network")]
    UnknownNetwork,
    #[error("request uses {found}, network uses {expected}")]
    EncryptionMismatch {
        expected: airgap_proto::Encryption,
        found: airgap_proto::Encryption,
    },
    #[error("unknown signer")]
    UnknownSigner,
    #[error("invalid era")]
    InvalidEra,
    #[error("genesis hash does not match network")]
    GenesisMismatch,
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),
}

/// Decode failure, with the offset at which it was detected
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("{reason} at byte {offset}{}", .type_id.map(|t| format!(" (type {t})")).unwrap_or_default())]
pub struct DecodeFailure {
    pub reason: DecodeReason,
    pub offset: usize,
    pub type_id: Option<TypeId>,
}

impl DecodeFailure {
    pub fn new(reason: DecodeReason, offset: usize) -> Self {
        Self {
            reason,
            offset,
            type_id: None,
        }
    }

    /// Attach a type id where not already set
    pub(crate) fn in_type(mut self, id: TypeId) -> Self {
        self.type_id.get_or_insert(id);
        self
    }

    pub(crate) fn registry(e: RegistryError, offset: usize) -> Self {
        let reason = match e {
            RegistryError::MalformedMetadata(m) => DecodeReason::MalformedMetadata(m),
            RegistryError::UnknownType(id) => {
                return Self::new(DecodeReason::UnknownType, offset).in_type(id)
            }
            RegistryError::VersionMismatch {
                requested,
                available,
                ..
            } => DecodeReason::VersionMismatch {
                requested,
                available,
            },
            RegistryError::UnknownNetwork(_) | RegistryError::Unavailable => {
                DecodeReason::UnknownNetwork
            }
            RegistryError::AlreadyLoaded { .. } => {
                DecodeReason::MalformedMetadata(e.to_string())
            }
        };
        Self::new(reason, offset)
    }
}
