// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Type-driven value decoding

use super::{cursor::Cursor, Card, CardKind, CardTree, DecodeFailure, DecodeReason, DecoderLimits};
use crate::{
    helpers::{fmt_balance, fmt_hex, ss58_encode},
    registry::{compact_target, Field, Primitive, RegistryEntry, TypeDef, TypeEntry, TypeId, Variant},
};

/// Decode a bare value of the provided type, the whole payload must be consumed
pub fn decode(
    payload: &[u8],
    type_id: TypeId,
    entry: &RegistryEntry,
    limits: &DecoderLimits,
) -> Result<CardTree, DecodeFailure> {
    let mut cur = Cursor::new(payload);

    let card = ValueDecoder::new(entry, limits).value(&mut cur, type_id, Hint::None, 0, 0)?;

    if cur.remaining() > 0 {
        return Err(cur.fail(DecodeReason::TrailingBytes(cur.remaining())));
    }

    Ok(vec![card])
}

/// Display hint carried from a field declaration to its value
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Hint {
    None,
    /// Integer rendered with network decimals and unit
    Balance,
    /// Variant rendered as a pallet call
    Call,
}

impl Hint {
    fn for_field(f: &Field) -> Self {
        match &f.type_name {
            Some(n) if n.contains("Balance") => Hint::Balance,
            _ => Hint::None,
        }
    }
}

pub(crate) struct ValueDecoder<'a> {
    entry: &'a RegistryEntry,
    limits: &'a DecoderLimits,
}

impl<'a> ValueDecoder<'a> {
    pub fn new(entry: &'a RegistryEntry, limits: &'a DecoderLimits) -> Self {
        Self { entry, limits }
    }

    /// Decode a value of type `id` at the cursor
    pub fn value(
        &self,
        cur: &mut Cursor,
        id: TypeId,
        hint: Hint,
        indent: u32,
        depth: u32,
    ) -> Result<Card, DecodeFailure> {
        self.value_inner(cur, id, hint, indent, depth)
            .map_err(|e| e.in_type(id))
    }

    fn value_inner(
        &self,
        cur: &mut Cursor,
        id: TypeId,
        hint: Hint,
        indent: u32,
        depth: u32,
    ) -> Result<Card, DecodeFailure> {
        if depth > self.limits.max_depth {
            return Err(cur.fail(DecodeReason::TooDeep));
        }

        let t = self
            .entry
            .lookup(id)
            .map_err(|e| DecodeFailure::registry(e, cur.pos()))?;
        let start = cur.pos();

        // Well known types
        match t.name() {
            "AccountId32" if self.byte_array(id) == Some(32) => {
                let b = cur.take(32)?;
                let a = ss58_encode(self.entry.specs().base58prefix, b);
                return Ok(Card::new(CardKind::Id, a, indent, start..cur.pos()));
            }
            "H256" if self.byte_array(id) == Some(32) => {
                let b = cur.take(32)?;
                return Ok(Card::new(CardKind::Hash, fmt_hex(b), indent, start..cur.pos()));
            }
            _ => (),
        }

        match &t.def {
            TypeDef::Primitive(p) => self.primitive(cur, *p, hint, indent),
            TypeDef::Compact(inner) => self.compact(cur, *inner, hint, indent),
            TypeDef::Sequence(inner) => self.sequence(cur, *inner, indent, depth),
            TypeDef::Array { len, ty } => self.array(cur, *len, *ty, indent, depth),
            TypeDef::Tuple(items) => {
                let mut cards = Vec::with_capacity(items.len());
                for i in items {
                    if cur.halted() {
                        break;
                    }
                    cards.push(self.value(cur, *i, Hint::None, indent + 1, depth + 1)?);
                }
                Ok(Card::new(CardKind::Tuple, t.name(), indent, start..start).with_children(cards))
            }
            TypeDef::Composite(fields) => {
                let cards = self.fields(cur, fields, None, indent + 1, depth)?;
                Ok(Card::new(CardKind::Composite, t.name(), indent, start..start)
                    .with_children(cards))
            }
            TypeDef::Variant(variants) => self.variant(cur, t, variants, hint, indent, depth),
        }
    }

    /// Decode composite or variant fields, named fields produce a zero-length
    /// name card with the value as its child
    fn fields(
        &self,
        cur: &mut Cursor,
        fields: &[Field],
        hint: Option<Hint>,
        indent: u32,
        depth: u32,
    ) -> Result<Vec<Card>, DecodeFailure> {
        let mut cards = Vec::with_capacity(fields.len());

        for f in fields {
            if cur.halted() {
                break;
            }

            let h = hint.unwrap_or_else(|| Hint::for_field(f));
            let pos = cur.pos();

            let c = match &f.name {
                Some(n) => {
                    let v = self.value(cur, f.ty, h, indent + 1, depth + 1)?;
                    Card::new(CardKind::FieldName, n.as_str(), indent, pos..pos)
                        .with_children(vec![v])
                }
                None => self.value(cur, f.ty, h, indent, depth + 1)?,
            };
            cards.push(c);
        }

        Ok(cards)
    }

    /// Decode a variant, unknown indices consume the rest of the region as raw bytes
    pub fn variant(
        &self,
        cur: &mut Cursor,
        t: &TypeEntry,
        variants: &[Variant],
        hint: Hint,
        indent: u32,
        depth: u32,
    ) -> Result<Card, DecodeFailure> {
        let start = cur.pos();
        let index = cur.u8()?;

        let (kind, what) = match (t.name(), hint) {
            ("RuntimeCall", _) => (CardKind::Pallet, "pallet"),
            (_, Hint::Call) => (CardKind::Method, "call"),
            _ => (CardKind::Variant, "variant"),
        };

        let v = match variants.iter().find(|v| v.index == index) {
            Some(v) => v,
            None => {
                #[cfg(feature = "log")]
                log::warn!("unknown {} {} for type {}", what, index, t.path);

                return Ok(unknown(cur, what, index, start, indent));
            }
        };

        // Fields of a runtime call variant are pallet calls
        let field_hint = match kind {
            CardKind::Pallet => Some(Hint::Call),
            _ => None,
        };
        let cards = self.fields(cur, &v.fields, field_hint, indent + 1, depth)?;

        Ok(Card::new(kind, v.name.as_str(), indent, start..start + 1).with_children(cards))
    }

    fn primitive(
        &self,
        cur: &mut Cursor,
        p: Primitive,
        hint: Hint,
        indent: u32,
    ) -> Result<Card, DecodeFailure> {
        let start = cur.pos();

        let (kind, value) = match p {
            Primitive::Bool => match cur.u8()? {
                0 => (CardKind::Bool, "false".to_string()),
                1 => (CardKind::Bool, "true".to_string()),
                b => return Err(DecodeFailure::new(DecodeReason::InvalidBool(b), start)),
            },
            Primitive::Char => {
                let v = cur.u32()?;
                let c = char::from_u32(v)
                    .ok_or_else(|| DecodeFailure::new(DecodeReason::InvalidChar(v), start))?;
                (CardKind::Char, c.to_string())
            }
            Primitive::Str => {
                let n = cur.length(1, self.limits.max_sequence_len)?;
                let offset = cur.pos();
                let b = cur.take(n)?;
                let s = core::str::from_utf8(b)
                    .map_err(|_| DecodeFailure::new(DecodeReason::InvalidUtf8, offset))?;
                (CardKind::Text, s.to_string())
            }
            p => {
                let n = p.fixed_len().unwrap_or(0);
                let b = cur.take(n)?;

                // Sign extend signed values
                let fill = match p.is_signed() && b.last().map(|v| v & 0x80 != 0) == Some(true) {
                    true => 0xff,
                    false => 0x00,
                };
                let mut a = [fill; 16];
                a[..n].copy_from_slice(b);

                match p.is_signed() {
                    true => (CardKind::Number, i128::from_le_bytes(a).to_string()),
                    false => self.number(u128::from_le_bytes(a), hint),
                }
            }
        };

        Ok(Card::new(kind, value, indent, start..cur.pos()))
    }

    fn compact(
        &self,
        cur: &mut Cursor,
        inner: TypeId,
        hint: Hint,
        indent: u32,
    ) -> Result<Card, DecodeFailure> {
        let start = cur.pos();

        let p = compact_target(self.entry.types(), inner)
            .ok_or_else(|| DecodeFailure::new(DecodeReason::UnknownType, start).in_type(inner))?;
        let v = cur.compact()?;

        // Value must fit the target integer
        let bits = p.fixed_len().unwrap_or(16) * 8;
        if bits < 128 && v >> bits != 0 {
            return Err(DecodeFailure::new(DecodeReason::InvalidCompact, start));
        }

        let (kind, value) = self.number(v, hint);
        Ok(Card::new(kind, value, indent, start..cur.pos()))
    }

    fn number(&self, v: u128, hint: Hint) -> (CardKind, String) {
        let s = self.entry.specs();
        match hint {
            Hint::Balance => (CardKind::Balance, fmt_balance(v, s.decimals, &s.unit)),
            _ => (CardKind::Number, v.to_string()),
        }
    }

    fn sequence(
        &self,
        cur: &mut Cursor,
        inner: TypeId,
        indent: u32,
        depth: u32,
    ) -> Result<Card, DecodeFailure> {
        let start = cur.pos();

        // Byte vectors render as hex
        if self.is_u8(inner) {
            let n = cur.length(1, self.limits.max_sequence_len)?;
            let b = cur.take(n)?;
            return Ok(Card::new(CardKind::Bytes, fmt_hex(b), indent, start..cur.pos()));
        }

        let min = self.entry.min_size(inner);
        let n = cur.length(min, self.limits.max_sequence_len)?;
        let head = start..cur.pos();

        let cards = self.elements(cur, inner, n, indent, depth)?;

        Ok(Card::new(CardKind::Sequence, format!("{n} items"), indent, head).with_children(cards))
    }

    fn array(
        &self,
        cur: &mut Cursor,
        len: u32,
        inner: TypeId,
        indent: u32,
        depth: u32,
    ) -> Result<Card, DecodeFailure> {
        let start = cur.pos();
        let n = len as usize;

        if self.is_u8(inner) {
            let b = cur.take(n)?;
            return Ok(Card::new(CardKind::Bytes, fmt_hex(b), indent, start..cur.pos()));
        }

        let min = self.entry.min_size(inner);
        if min == 0 && len as u64 > self.limits.max_sequence_len {
            return Err(cur.fail(DecodeReason::LengthOverrun {
                claimed: len as u128,
                remaining: cur.remaining(),
            }));
        }
        if (len as u64).saturating_mul(min) > cur.remaining() as u64 {
            return Err(cur.fail(DecodeReason::UnexpectedEnd));
        }

        let cards = self.elements(cur, inner, n, indent, depth)?;

        Ok(Card::new(CardKind::Sequence, format!("{n} items"), indent, start..start)
            .with_children(cards))
    }

    fn elements(
        &self,
        cur: &mut Cursor,
        inner: TypeId,
        n: usize,
        indent: u32,
        depth: u32,
    ) -> Result<Vec<Card>, DecodeFailure> {
        let mut cards = Vec::with_capacity(n.min(cur.remaining()));
        for _ in 0..n {
            if cur.halted() {
                break;
            }
            cards.push(self.value(cur, inner, Hint::None, indent + 1, depth + 1)?);
        }
        Ok(cards)
    }

    fn is_u8(&self, id: TypeId) -> bool {
        matches!(
            self.entry.lookup(id).map(|t| &t.def),
            Ok(TypeDef::Primitive(Primitive::U8))
        )
    }

    /// Length of a byte array, unwrapping single-field wrappers
    fn byte_array(&self, mut id: TypeId) -> Option<u32> {
        for _ in 0..=self.entry.types().len() {
            match &self.entry.lookup(id).ok()?.def {
                TypeDef::Array { len, ty } if self.is_u8(*ty) => return Some(*len),
                TypeDef::Composite(f) if f.len() == 1 => id = f[0].ty,
                TypeDef::Tuple(t) if t.len() == 1 => id = t[0],
                _ => return None,
            }
        }
        None
    }
}

/// Card for an unknown variant, with the rest of the region as raw bytes
fn unknown(cur: &mut Cursor, what: &str, index: u8, start: usize, indent: u32) -> Card {
    let raw = cur.halt();
    let b = cur.bytes(raw.clone());

    Card::new(
        CardKind::UnknownVariant,
        format!("unknown {what} {index}"),
        indent,
        start..start + 1,
    )
    .with_children(vec![Card::new(CardKind::Raw, fmt_hex(b), indent + 1, raw)])
}
