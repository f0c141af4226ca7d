// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Type descriptors held by a [RegistryEntry][super::RegistryEntry]

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

use airgap_proto::Encryption;

/// Type identifier, the index of a type within its registry entry
pub type TypeId = u32;

/// Primitive types
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum Primitive {
    Bool = 0,
    Char = 1,
    Str = 2,
    U8 = 3,
    U16 = 4,
    U32 = 5,
    U64 = 6,
    U128 = 7,
    I8 = 8,
    I16 = 9,
    I32 = 10,
    I64 = 11,
    I128 = 12,
}

impl Primitive {
    /// Encoded length for fixed-width primitives
    pub const fn fixed_len(&self) -> Option<usize> {
        use Primitive::*;

        match self {
            Bool | U8 | I8 => Some(1),
            U16 | I16 => Some(2),
            Char | U32 | I32 => Some(4),
            U64 | I64 => Some(8),
            U128 | I128 => Some(16),
            Str => None,
        }
    }

    /// Check whether this is an unsigned integer (and may be compact encoded)
    pub const fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::U128
        )
    }

    /// Check whether this is a signed integer
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::I128
        )
    }
}

/// Named (or positional) field of a composite type or variant
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Field {
    /// Field name, `None` for tuple-like structs
    pub name: Option<String>,
    /// Declared type name, used for display hints (eg. `BalanceOf<T>`)
    pub type_name: Option<String>,
    /// Field type
    pub ty: TypeId,
}

impl Field {
    pub fn new(name: Option<&str>, type_name: Option<&str>, ty: TypeId) -> Self {
        Self {
            name: name.map(String::from),
            type_name: type_name.map(String::from),
            ty,
        }
    }
}

/// Variant of an enumeration
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Variant {
    /// Discriminant byte
    pub index: u8,
    pub name: String,
    pub fields: Vec<Field>,
}

/// Recursive type descriptor
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeDef {
    Primitive(Primitive),
    /// SCALE compact encoded integer
    Compact(TypeId),
    /// Variable length sequence with compact length prefix
    Sequence(TypeId),
    /// Fixed length array
    Array { len: u32, ty: TypeId },
    Tuple(Vec<TypeId>),
    Composite(Vec<Field>),
    /// Tagged union
    Variant(Vec<Variant>),
}

impl TypeDef {
    /// Wire tag for this definition
    pub(crate) const fn tag(&self) -> u8 {
        match self {
            TypeDef::Primitive(_) => 0,
            TypeDef::Compact(_) => 1,
            TypeDef::Sequence(_) => 2,
            TypeDef::Array { .. } => 3,
            TypeDef::Tuple(_) => 4,
            TypeDef::Composite(_) => 5,
            TypeDef::Variant(_) => 6,
        }
    }

    /// Iterate over the types referenced by this definition
    pub fn references(&self) -> Vec<TypeId> {
        match self {
            TypeDef::Primitive(_) => vec![],
            TypeDef::Compact(t) | TypeDef::Sequence(t) | TypeDef::Array { ty: t, .. } => vec![*t],
            TypeDef::Tuple(t) => t.clone(),
            TypeDef::Composite(f) => f.iter().map(|f| f.ty).collect(),
            TypeDef::Variant(v) => v
                .iter()
                .flat_map(|v| v.fields.iter().map(|f| f.ty))
                .collect(),
        }
    }
}

/// Registry type entry
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeEntry {
    /// Fully qualified path, eg. `sp_core::crypto::AccountId32`
    pub path: String,
    pub def: TypeDef,
}

impl TypeEntry {
    pub fn new(path: &str, def: TypeDef) -> Self {
        Self {
            path: path.to_string(),
            def,
        }
    }

    /// Short type name (final path segment)
    pub fn name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }
}

/// Pallet (module) descriptor
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pallet {
    pub name: String,
    /// Call index byte
    pub index: u8,
    /// Call enumeration type, `None` for pallets without calls
    pub calls: Option<TypeId>,
}

/// Network display parameters carried with each metadata blob
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NetworkSpecs {
    pub name: String,
    /// SS58 address prefix
    pub base58prefix: u16,
    /// Balance decimal places
    pub decimals: u8,
    /// Balance unit, eg. `DOT`
    pub unit: String,
    /// Signature scheme used by accounts on this network
    pub encryption: Encryption,
}

/// Network identifier (genesis hash)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetworkId(pub [u8; 32]);

impl NetworkId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for NetworkId {
    fn from(v: [u8; 32]) -> Self {
        Self(v)
    }
}

impl core::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}
