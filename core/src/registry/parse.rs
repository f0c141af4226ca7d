// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Metadata blob encoding
//!
//! ```text
//! "meta" | VERSION (0x01) | NAME: str | SPEC_VERSION: u32 | BASE58_PREFIX: u16
//!        | DECIMALS: u8 | UNIT: str | ENCRYPTION: u8
//!        | compact(N) TYPE * N | compact(M) PALLET * M
//!
//! TYPE   := PATH: str | TAG: u8 | DEF
//! FIELD  := NAME: option<str> | TYPE_NAME: option<str> | TYPE: compact
//! PALLET := NAME: str | INDEX: u8 | CALLS: option<compact>
//! ```
//!
//! Integers are little-endian, `str` is a compact length followed by UTF-8
//! bytes, `option` is `0x00` or `0x01` followed by the value.

use byteorder::{ByteOrder, LittleEndian};

use airgap_proto::{
    compact::{decode_compact, encode_compact},
    Encryption,
};

use super::{
    types::{Field, NetworkSpecs, Pallet, Primitive, TypeDef, TypeEntry, TypeId, Variant},
    RegistryError,
};

/// Metadata blob magic
pub const METADATA_MAGIC: &[u8; 4] = b"meta";

/// Metadata blob format version
pub const METADATA_VERSION: u8 = 0x01;

/// Decoded (but not yet validated) metadata blob
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct Blob {
    pub spec_version: u32,
    pub specs: NetworkSpecs,
    pub types: Vec<TypeEntry>,
    pub pallets: Vec<Pallet>,
}

/// Bounds-checked reader over a metadata blob
struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

fn malformed(what: &str, at: usize) -> RegistryError {
    RegistryError::MalformedMetadata(format!("{what} at offset {at}"))
}

impl<'a> Reader<'a> {
    fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], RegistryError> {
        let b = self
            .buff
            .get(self.index..)
            .and_then(|b| b.get(..n))
            .ok_or_else(|| malformed("unexpected end of metadata", self.index))?;
        self.index += n;
        Ok(b)
    }

    fn u8(&mut self) -> Result<u8, RegistryError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, RegistryError> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    fn u32(&mut self) -> Result<u32, RegistryError> {
        Ok(LittleEndian::read_u32(self.bytes(4)?))
    }

    fn compact(&mut self) -> Result<u128, RegistryError> {
        let at = self.index;
        let (v, n) =
            decode_compact(&self.buff[at..]).map_err(|_| malformed("invalid compact", at))?;
        self.index += n;
        Ok(v)
    }

    /// Read an element count, bounded by the remaining bytes
    fn count(&mut self) -> Result<usize, RegistryError> {
        let at = self.index;
        let n = self.compact()?;
        if n > self.remaining() as u128 {
            return Err(malformed("count exceeds remaining bytes", at));
        }
        Ok(n as usize)
    }

    fn type_id(&mut self) -> Result<TypeId, RegistryError> {
        let at = self.index;
        TypeId::try_from(self.compact()?).map_err(|_| malformed("type id out of range", at))
    }

    fn str(&mut self) -> Result<String, RegistryError> {
        let n = self.count()?;
        let at = self.index;
        let b = self.bytes(n)?;
        core::str::from_utf8(b)
            .map(String::from)
            .map_err(|_| malformed("invalid utf8", at))
    }

    fn option<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RegistryError>,
    ) -> Result<Option<T>, RegistryError> {
        let at = self.index;
        match self.u8()? {
            0 => Ok(None),
            1 => f(self).map(Some),
            _ => Err(malformed("invalid option tag", at)),
        }
    }

    fn field(&mut self) -> Result<Field, RegistryError> {
        Ok(Field {
            name: self.option(Self::str)?,
            type_name: self.option(Self::str)?,
            ty: self.type_id()?,
        })
    }

    fn fields(&mut self) -> Result<Vec<Field>, RegistryError> {
        let n = self.count()?;
        (0..n).map(|_| self.field()).collect()
    }

    fn type_def(&mut self) -> Result<TypeDef, RegistryError> {
        let at = self.index;
        let def = match self.u8()? {
            0 => {
                let p = self.u8()?;
                let p = Primitive::try_from(p).map_err(|_| malformed("unknown primitive", at))?;
                TypeDef::Primitive(p)
            }
            1 => TypeDef::Compact(self.type_id()?),
            2 => TypeDef::Sequence(self.type_id()?),
            3 => TypeDef::Array {
                len: self.u32()?,
                ty: self.type_id()?,
            },
            4 => {
                let n = self.count()?;
                TypeDef::Tuple((0..n).map(|_| self.type_id()).collect::<Result<_, _>>()?)
            }
            5 => TypeDef::Composite(self.fields()?),
            6 => {
                let n = self.count()?;
                let mut variants = Vec::with_capacity(n);
                for _ in 0..n {
                    variants.push(Variant {
                        index: self.u8()?,
                        name: self.str()?,
                        fields: self.fields()?,
                    });
                }
                TypeDef::Variant(variants)
            }
            _ => return Err(malformed("unknown type tag", at)),
        };
        Ok(def)
    }

    fn pallet(&mut self) -> Result<Pallet, RegistryError> {
        Ok(Pallet {
            name: self.str()?,
            index: self.u8()?,
            calls: self.option(Self::type_id)?,
        })
    }
}

/// Parse a metadata blob
pub(crate) fn parse(raw: &[u8]) -> Result<Blob, RegistryError> {
    let mut r = Reader::new(raw);

    if r.bytes(4)? != METADATA_MAGIC {
        return Err(malformed("invalid magic", 0));
    }
    let v = r.u8()?;
    if v != METADATA_VERSION {
        return Err(RegistryError::MalformedMetadata(format!(
            "unsupported metadata version {v}"
        )));
    }

    let name = r.str()?;
    let spec_version = r.u32()?;
    let base58prefix = r.u16()?;
    let decimals = r.u8()?;
    let unit = r.str()?;

    let at = r.index;
    let encryption = match Encryption::try_from(r.u8()?) {
        Ok(Encryption::Unsigned) | Err(_) => return Err(malformed("invalid encryption", at)),
        Ok(e) => e,
    };

    let n = r.count()?;
    let mut types = Vec::with_capacity(n);
    for _ in 0..n {
        let path = r.str()?;
        let def = r.type_def()?;
        types.push(TypeEntry { path, def });
    }

    let m = r.count()?;
    let pallets = (0..m).map(|_| r.pallet()).collect::<Result<Vec<_>, _>>()?;

    if r.remaining() != 0 {
        return Err(malformed("trailing bytes", r.index));
    }

    Ok(Blob {
        spec_version,
        specs: NetworkSpecs {
            name,
            base58prefix,
            decimals,
            unit,
            encryption,
        },
        types,
        pallets,
    })
}

fn put_str(s: &str, out: &mut Vec<u8>) {
    encode_compact(s.len() as u128, out);
    out.extend_from_slice(s.as_bytes());
}

fn put_opt_str(s: &Option<String>, out: &mut Vec<u8>) {
    match s {
        Some(s) => {
            out.push(1);
            put_str(s, out);
        }
        None => out.push(0),
    }
}

fn put_fields(fields: &[Field], out: &mut Vec<u8>) {
    encode_compact(fields.len() as u128, out);
    for f in fields {
        put_opt_str(&f.name, out);
        put_opt_str(&f.type_name, out);
        encode_compact(f.ty as u128, out);
    }
}

/// Encode a metadata blob
pub(crate) fn encode(
    spec_version: u32,
    specs: &NetworkSpecs,
    types: &[TypeEntry],
    pallets: &[Pallet],
) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(METADATA_MAGIC);
    out.push(METADATA_VERSION);
    put_str(&specs.name, &mut out);
    out.extend_from_slice(&spec_version.to_le_bytes());
    out.extend_from_slice(&specs.base58prefix.to_le_bytes());
    out.push(specs.decimals);
    put_str(&specs.unit, &mut out);
    out.push(specs.encryption as u8);

    encode_compact(types.len() as u128, &mut out);
    for t in types {
        put_str(&t.path, &mut out);
        out.push(t.def.tag());

        match &t.def {
            TypeDef::Primitive(p) => out.push(*p as u8),
            TypeDef::Compact(t) | TypeDef::Sequence(t) => encode_compact(*t as u128, &mut out),
            TypeDef::Array { len, ty } => {
                out.extend_from_slice(&len.to_le_bytes());
                encode_compact(*ty as u128, &mut out);
            }
            TypeDef::Tuple(t) => {
                encode_compact(t.len() as u128, &mut out);
                for t in t {
                    encode_compact(*t as u128, &mut out);
                }
            }
            TypeDef::Composite(f) => put_fields(f, &mut out),
            TypeDef::Variant(v) => {
                encode_compact(v.len() as u128, &mut out);
                for v in v {
                    out.push(v.index);
                    put_str(&v.name, &mut out);
                    put_fields(&v.fields, &mut out);
                }
            }
        }
    }

    encode_compact(pallets.len() as u128, &mut out);
    for p in pallets {
        put_str(&p.name, &mut out);
        out.push(p.index);
        match p.calls {
            Some(c) => {
                out.push(1);
                encode_compact(c as u128, &mut out);
            }
            None => out.push(0),
        }
    }

    out
}
