// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request decoding
//!
//! Requests are a [Prelude] followed by a body per [PayloadKind]. Transaction
//! extensions are read before the call so the call can be decoded under the
//! registry entry matching the transaction's spec version, the decoded cards
//! are then assembled in byte order.

use core::ops::Range;

use airgap_proto::{
    prelude::{MetadataHeader, PRELUDE_LEN},
    Encryption, PayloadKind, Prelude,
};
use encdec::{Decode, DecodeOwned};
use strum::Display;

use super::{
    cursor::Cursor,
    value::{Hint, ValueDecoder},
    Card, CardKind, CardTree, DecodeFailure, DecodeReason, DecoderLimits,
};
use crate::{
    helpers::{blake2_256, fmt_balance, fmt_hex},
    registry::{MetadataSource, NetworkId, RegistryEntry, RegistryError},
    vault::MultiSigner,
};

/// Transactions longer than this are signed by hash
pub const MAX_UNHASHED_LEN: usize = 256;

const HASH_LEN: usize = 32;

/// Kind of signable request
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SignKind {
    Transaction,
    Message,
}

/// Decoded request awaiting user approval
#[derive(Clone, PartialEq, Debug)]
pub enum Request {
    /// Payload to be signed by `signer`
    Sign {
        signer: MultiSigner,
        network: NetworkId,
        kind: SignKind,
        /// Bytes passed to the signer
        payload: Vec<u8>,
    },
    /// Validated metadata update
    LoadMetadata(Box<RegistryEntry>),
}

/// Card tree and request produced by decoding a scanned payload
#[derive(Clone, PartialEq, Debug)]
pub struct Review {
    pub cards: CardTree,
    pub request: Request,
}

/// Decode a scanned signing request of any kind
pub fn decode_request<S: MetadataSource + ?Sized>(
    payload: &[u8],
    source: &S,
    limits: &DecoderLimits,
) -> Result<Review, DecodeFailure> {
    let prelude = prelude(payload)?;

    #[cfg(feature = "log")]
    log::debug!(
        "decoding {} request ({}, {} bytes)",
        prelude.kind,
        prelude.encryption,
        payload.len()
    );

    match prelude.kind {
        PayloadKind::Transaction => transaction(payload, prelude.encryption, source, limits),
        PayloadKind::Message => message(payload, prelude.encryption, source),
        PayloadKind::LoadMetadata => metadata(payload),
    }
}

/// Decode a transaction signing request
pub fn decode_transaction<S: MetadataSource + ?Sized>(
    payload: &[u8],
    source: &S,
    limits: &DecoderLimits,
) -> Result<Review, DecodeFailure> {
    let encryption = expect_kind(payload, PayloadKind::Transaction)?;
    transaction(payload, encryption, source, limits)
}

/// Decode a message signing request
pub fn decode_message<S: MetadataSource + ?Sized>(
    payload: &[u8],
    source: &S,
) -> Result<Review, DecodeFailure> {
    let encryption = expect_kind(payload, PayloadKind::Message)?;
    message(payload, encryption, source)
}

/// Decode and validate a metadata update request
pub fn decode_metadata_update(payload: &[u8]) -> Result<Review, DecodeFailure> {
    expect_kind(payload, PayloadKind::LoadMetadata)?;
    metadata(payload)
}

fn prelude(payload: &[u8]) -> Result<Prelude, DecodeFailure> {
    let (prelude, _) = Prelude::decode_owned(payload).map_err(|e| {
        let reason = match e {
            airgap_proto::Error::InvalidLength => DecodeReason::UnexpectedEnd,
            _ => DecodeReason::InvalidPrelude,
        };
        DecodeFailure::new(reason, 0)
    })?;

    Ok(prelude)
}

fn expect_kind(payload: &[u8], kind: PayloadKind) -> Result<Encryption, DecodeFailure> {
    let p = prelude(payload)?;
    match p.kind == kind {
        true => Ok(p.encryption),
        false => Err(DecodeFailure::new(DecodeReason::InvalidPrelude, 2)),
    }
}

/// Signed request framing shared by transactions and messages
struct Framing {
    signer: MultiSigner,
    author: Range<usize>,
    network: NetworkId,
    /// Offset of the trailing network genesis hash
    genesis_at: usize,
}

impl Framing {
    fn parse(payload: &[u8], encryption: Encryption) -> Result<Self, DecodeFailure> {
        let mut cur = Cursor::new(payload);
        cur.take(PRELUDE_LEN)?;

        let key = cur.take(encryption.public_key_len())?;
        let signer = MultiSigner::from_parts(encryption, key)
            .ok_or_else(|| DecodeFailure::new(DecodeReason::InvalidPrelude, 1))?;
        let author = 0..cur.pos();

        let genesis_at = payload
            .len()
            .checked_sub(HASH_LEN)
            .filter(|g| *g > author.end)
            .ok_or_else(|| DecodeFailure::new(DecodeReason::UnexpectedEnd, payload.len()))?;

        let mut network = [0u8; HASH_LEN];
        network.copy_from_slice(&payload[genesis_at..]);

        Ok(Self {
            signer,
            author,
            network: NetworkId(network),
            genesis_at,
        })
    }

    fn check_encryption(&self, entry: &RegistryEntry) -> Result<(), DecodeFailure> {
        let expected = entry.specs().encryption;
        let found = self.signer.encryption();

        match expected == found {
            true => Ok(()),
            false => Err(DecodeFailure::new(
                DecodeReason::EncryptionMismatch { expected, found },
                1,
            )),
        }
    }

    fn author_card(&self, entry: &RegistryEntry) -> Card {
        let address = self.signer.to_ss58(entry.specs().base58prefix);
        Card::new(CardKind::Author, address, 0, self.author.clone())
    }

    fn network_card(&self, entry: &RegistryEntry, len: usize) -> Card {
        Card::new(
            CardKind::Network,
            entry.specs().name.as_str(),
            0,
            self.genesis_at..len,
        )
    }

    fn network_error(&self, e: RegistryError, offset: usize) -> DecodeFailure {
        match e {
            RegistryError::UnknownNetwork(_) => {
                DecodeFailure::new(DecodeReason::UnknownNetwork, self.genesis_at)
            }
            e => DecodeFailure::registry(e, offset),
        }
    }
}

fn transaction<S: MetadataSource + ?Sized>(
    payload: &[u8],
    encryption: Encryption,
    source: &S,
    limits: &DecoderLimits,
) -> Result<Review, DecodeFailure> {
    let f = Framing::parse(payload, encryption)?;

    // Call length, bounded by the request body
    let mut body = Cursor::region(payload, f.author.end..f.genesis_at);
    let len_at = body.pos();
    let call_len = body.length(1, 0)?;
    let call = body.pos()..body.pos() + call_len;

    // Extensions select the registry entry
    let ext = Extensions::parse(payload, call.end..f.genesis_at)?;

    let entry = source
        .entry(&f.network, ext.spec_version.0)
        .map_err(|e| f.network_error(e, ext.spec_version.1.start))?;
    f.check_encryption(&entry)?;

    if ext.genesis.0 != *f.network.as_bytes() {
        return Err(DecodeFailure::new(
            DecodeReason::GenesisMismatch,
            ext.genesis.1.start,
        ));
    }

    let mut cards = vec![f.author_card(&entry)];
    cards.push(call_card(payload, &entry, limits, len_at, call.clone())?);
    cards.extend(ext.cards(&entry));
    cards.push(f.network_card(&entry, payload.len()));

    // Long transactions are signed by hash
    let signable = &payload[call.start..f.genesis_at];
    let signable = match signable.len() > MAX_UNHASHED_LEN {
        true => blake2_256(signable).to_vec(),
        false => signable.to_vec(),
    };

    Ok(Review {
        cards,
        request: Request::Sign {
            signer: f.signer,
            network: f.network,
            kind: SignKind::Transaction,
            payload: signable,
        },
    })
}

/// Decode the call region, the pallet card covers the call length prefix
/// and pallet index
fn call_card(
    payload: &[u8],
    entry: &RegistryEntry,
    limits: &DecoderLimits,
    len_at: usize,
    call: Range<usize>,
) -> Result<Card, DecodeFailure> {
    let mut cur = Cursor::region(payload, call);
    let index = cur.u8()?;
    let head = len_at..cur.pos();

    let pallet = entry.pallet(index);

    let card = match pallet.and_then(|p| p.calls.map(|c| (p, c))) {
        Some((p, calls)) => {
            let method = ValueDecoder::new(entry, limits).value(&mut cur, calls, Hint::Call, 1, 1)?;
            Card::new(CardKind::Pallet, p.name.as_str(), 0, head).with_children(vec![method])
        }
        None => {
            #[cfg(feature = "log")]
            log::warn!("unknown pallet {}", index);

            let raw = cur.halt();
            let b = cur.bytes(raw.clone());
            Card::new(CardKind::Pallet, format!("unknown pallet {index}"), 0, head)
                .with_children(vec![Card::new(CardKind::Raw, fmt_hex(b), 1, raw)])
        }
    };

    if cur.remaining() > 0 {
        return Err(cur.fail(DecodeReason::TrailingBytes(cur.remaining())));
    }

    Ok(card)
}

/// Transaction mortality
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Era {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

impl Era {
    fn decode(cur: &mut Cursor) -> Result<Self, DecodeFailure> {
        let start = cur.pos();

        let first = cur.u8()?;
        if first == 0 {
            return Ok(Era::Immortal);
        }

        let enc = u16::from_le_bytes([first, cur.u8()?]) as u64;
        let period = 2u64 << (enc % 16);
        let quantize = (period >> 12).max(1);
        let phase = (enc >> 4) * quantize;

        if period < 4 || phase >= period {
            return Err(DecodeFailure::new(DecodeReason::InvalidEra, start));
        }

        Ok(Era::Mortal { period, phase })
    }
}

impl core::fmt::Display for Era {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Era::Immortal => write!(f, "immortal"),
            Era::Mortal { period, phase } => write!(f, "mortal, phase {phase}, period {period}"),
        }
    }
}

/// Signed extensions with the byte range of each
struct Extensions {
    era: (Era, Range<usize>),
    nonce: (u128, Range<usize>),
    tip: (u128, Range<usize>),
    spec_version: (u32, Range<usize>),
    tx_version: (u32, Range<usize>),
    genesis: ([u8; HASH_LEN], Range<usize>),
    block: ([u8; HASH_LEN], Range<usize>),
}

impl Extensions {
    fn parse(payload: &[u8], region: Range<usize>) -> Result<Self, DecodeFailure> {
        let mut cur = Cursor::region(payload, region);

        fn read<'a, T>(
            cur: &mut Cursor<'a>,
            f: impl FnOnce(&mut Cursor<'a>) -> Result<T, DecodeFailure>,
        ) -> Result<(T, Range<usize>), DecodeFailure> {
            let start = cur.pos();
            let v = f(cur)?;
            Ok((v, start..cur.pos()))
        }

        let e = Self {
            era: read(&mut cur, Era::decode)?,
            nonce: read(&mut cur, |c| c.compact())?,
            tip: read(&mut cur, |c| c.compact())?,
            spec_version: read(&mut cur, |c| c.u32())?,
            tx_version: read(&mut cur, |c| c.u32())?,
            genesis: read(&mut cur, |c| c.array())?,
            block: read(&mut cur, |c| c.array())?,
        };

        if cur.remaining() > 0 {
            return Err(cur.fail(DecodeReason::TrailingBytes(cur.remaining())));
        }

        Ok(e)
    }

    fn cards(&self, entry: &RegistryEntry) -> Vec<Card> {
        let s = entry.specs();

        vec![
            Card::new(CardKind::Era, self.era.0.to_string(), 0, self.era.1.clone()),
            Card::new(CardKind::Nonce, self.nonce.0.to_string(), 0, self.nonce.1.clone()),
            Card::new(
                CardKind::Tip,
                fmt_balance(self.tip.0, s.decimals, &s.unit),
                0,
                self.tip.1.clone(),
            ),
            Card::new(
                CardKind::SpecVersion,
                format!("{}{}", s.name, self.spec_version.0),
                0,
                self.spec_version.1.clone(),
            ),
            Card::new(
                CardKind::TxVersion,
                self.tx_version.0.to_string(),
                0,
                self.tx_version.1.clone(),
            ),
            Card::new(
                CardKind::GenesisHash,
                fmt_hex(&self.genesis.0),
                0,
                self.genesis.1.clone(),
            ),
            Card::new(
                CardKind::BlockHash,
                fmt_hex(&self.block.0),
                0,
                self.block.1.clone(),
            ),
        ]
    }
}

fn message<S: MetadataSource + ?Sized>(
    payload: &[u8],
    encryption: Encryption,
    source: &S,
) -> Result<Review, DecodeFailure> {
    let f = Framing::parse(payload, encryption)?;

    let mut body = Cursor::region(payload, f.author.end..f.genesis_at);
    let len_at = body.pos();
    let n = body.length(1, 0)?;
    let msg = body.take(n)?;
    if body.remaining() > 0 {
        return Err(body.fail(DecodeReason::TrailingBytes(body.remaining())));
    }

    let entry = source
        .latest(&f.network)
        .map_err(|e| f.network_error(e, f.genesis_at))?;
    f.check_encryption(&entry)?;

    let text = match core::str::from_utf8(msg) {
        Ok(s) => s.to_string(),
        Err(_) => fmt_hex(msg),
    };

    let cards = vec![
        f.author_card(&entry),
        Card::new(CardKind::Message, text, 0, len_at..body.pos()),
        f.network_card(&entry, payload.len()),
    ];

    // Messages are wrapped so they can never be valid transactions
    let mut signable = Vec::with_capacity(msg.len() + 15);
    signable.extend_from_slice(b"<Bytes>");
    signable.extend_from_slice(msg);
    signable.extend_from_slice(b"</Bytes>");

    Ok(Review {
        cards,
        request: Request::Sign {
            signer: f.signer,
            network: f.network,
            kind: SignKind::Message,
            payload: signable,
        },
    })
}

fn metadata(payload: &[u8]) -> Result<Review, DecodeFailure> {
    let (h, n) = MetadataHeader::decode(&payload[PRELUDE_LEN..])
        .map_err(|_| DecodeFailure::new(DecodeReason::UnexpectedEnd, PRELUDE_LEN))?;
    let blob_at = PRELUDE_LEN + n;

    let network = NetworkId(h.genesis_hash);
    let entry = RegistryEntry::load(network, &payload[blob_at..])
        .map_err(|e| DecodeFailure::registry(e, blob_at))?;

    let cards = vec![
        Card::new(CardKind::Network, network.to_string(), 0, 0..blob_at),
        Card::new(
            CardKind::Metadata,
            format!("{} version {}", entry.specs().name, entry.spec_version()),
            0,
            blob_at..payload.len(),
        ),
    ];

    Ok(Review {
        cards,
        request: Request::LoadMetadata(Box::new(entry)),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn era_decoding() {
        let tests: &[(&[u8], Result<Era, DecodeReason>)] = &[
            (&[0x00], Ok(Era::Immortal)),
            // period 64, phase 42
            (
                &[0xa5, 0x02],
                Ok(Era::Mortal {
                    period: 64,
                    phase: 42,
                }),
            ),
            // period 2
            (&[0x10, 0x00], Err(DecodeReason::InvalidEra)),
            (&[0x01], Err(DecodeReason::UnexpectedEnd)),
        ];

        for (b, e) in tests {
            let mut c = Cursor::new(b);
            assert_eq!(Era::decode(&mut c).map_err(|f| f.reason), *e, "{b:02x?}");
        }
    }

    #[test]
    fn invalid_preludes() {
        let r = Registry::new();
        let l = DecoderLimits::default();

        let tests: &[(&[u8], DecodeReason)] = &[
            (&[0x53, 0x01], DecodeReason::UnexpectedEnd),
            (&[0x54, 0x01, 0x02, 0x00], DecodeReason::InvalidPrelude),
            // Metadata must be unsigned
            (&[0x53, 0x01, 0x80, 0x00], DecodeReason::InvalidPrelude),
            (&[0x53, 0xff, 0x02, 0x00], DecodeReason::InvalidPrelude),
        ];

        for (p, reason) in tests {
            assert_eq!(decode_request(*p, &r, &l).map(|_| ()).map_err(|f| f.reason), Err(reason.clone()));
        }
    }

    #[test]
    fn truncated_requests() {
        let r = Registry::new();
        let l = DecoderLimits::default();

        // Public key without network hash
        let mut p = vec![0x53, 0x01, 0x03];
        p.extend_from_slice(&[0x11; 32]);
        let e = decode_request(&p, &r, &l).unwrap_err();
        assert_eq!(e.reason, DecodeReason::UnexpectedEnd);

        // Message for an unknown network
        p.push(0x00);
        p.extend_from_slice(&[0x22; 32]);
        let e = decode_request(&p, &r, &l).unwrap_err();
        assert_eq!((e.reason, e.offset), (DecodeReason::UnknownNetwork, 36));
    }
}
