// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Versioned type registry
//!
//! A [RegistryEntry] describes how raw bytes map to typed values for one
//! `(network, spec_version)` pair. Entries are validated on load and
//! immutable afterwards, a new runtime version always produces a new entry.
//! The [Registry] holds every loaded entry and only ever resolves exact
//! version matches.

use std::{collections::BTreeMap, sync::Arc};

mod types;
pub use types::*;

mod parse;
pub use parse::{METADATA_MAGIC, METADATA_VERSION};

/// Registry errors
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum RegistryError {
    /// Metadata could not be parsed or failed validation
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Type id not present in the registry entry
    #[error("unknown type {0}")]
    UnknownType(TypeId),

    /// No metadata loaded for this network
    #[error("unknown network {0}")]
    UnknownNetwork(NetworkId),

    /// Metadata is loaded for this network, but not for the requested version
    #[error("no metadata for {network} version {requested} (available: {available:?})")]
    VersionMismatch {
        network: NetworkId,
        requested: u32,
        available: Vec<u32>,
    },

    /// A different entry is already loaded for this network and version
    #[error("metadata for {network} version {spec_version} already loaded")]
    AlreadyLoaded { network: NetworkId, spec_version: u32 },

    /// Registry lock poisoned
    #[error("registry unavailable")]
    Unavailable,
}

/// Validated, immutable registry entry
#[derive(Clone, PartialEq, Debug)]
pub struct RegistryEntry {
    network_id: NetworkId,
    spec_version: u32,
    specs: NetworkSpecs,
    types: Vec<TypeEntry>,
    pallets: Vec<Pallet>,
    /// Minimum encoded size of each type
    min_sizes: Vec<u64>,
}

impl RegistryEntry {
    /// Parse and validate a metadata blob for the provided network
    pub fn load(network_id: NetworkId, raw: &[u8]) -> Result<Self, RegistryError> {
        let b = parse::parse(raw)?;
        Self::new(network_id, b.spec_version, b.specs, b.types, b.pallets)
    }

    /// Build and validate an entry from its parts
    pub fn new(
        network_id: NetworkId,
        spec_version: u32,
        specs: NetworkSpecs,
        types: Vec<TypeEntry>,
        pallets: Vec<Pallet>,
    ) -> Result<Self, RegistryError> {
        validate(&types, &pallets)?;
        let min_sizes = min_sizes(&types)?;

        #[cfg(feature = "log")]
        log::debug!(
            "loaded {} v{} ({} types, {} pallets)",
            specs.name,
            spec_version,
            types.len(),
            pallets.len()
        );

        Ok(Self {
            network_id,
            spec_version,
            specs,
            types,
            pallets,
            min_sizes,
        })
    }

    /// Encode entry to metadata blob format
    pub fn encode(&self) -> Vec<u8> {
        parse::encode(self.spec_version, &self.specs, &self.types, &self.pallets)
    }

    /// Lookup a type descriptor by id
    pub fn lookup(&self, id: TypeId) -> Result<&TypeEntry, RegistryError> {
        self.types
            .get(id as usize)
            .ok_or(RegistryError::UnknownType(id))
    }

    /// Minimum number of bytes any value of the provided type consumes
    pub fn min_size(&self, id: TypeId) -> u64 {
        self.min_sizes.get(id as usize).copied().unwrap_or(0)
    }

    /// Lookup a pallet by call index
    pub fn pallet(&self, index: u8) -> Option<&Pallet> {
        self.pallets.iter().find(|p| p.index == index)
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    pub fn spec_version(&self) -> u32 {
        self.spec_version
    }

    pub fn specs(&self) -> &NetworkSpecs {
        &self.specs
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn pallets(&self) -> &[Pallet] {
        &self.pallets
    }
}

/// Check internal consistency of a type table
fn validate(types: &[TypeEntry], pallets: &[Pallet]) -> Result<(), RegistryError> {
    let exists = |t: TypeId| (t as usize) < types.len();

    for (i, t) in types.iter().enumerate() {
        // No dangling references
        if let Some(r) = t.def.references().into_iter().find(|r| !exists(*r)) {
            return Err(RegistryError::MalformedMetadata(format!(
                "type {i} references unknown type {r}"
            )));
        }

        match &t.def {
            // Compact wrappers must resolve to an unsigned integer
            TypeDef::Compact(inner) if compact_target(types, *inner).is_none() => {
                return Err(RegistryError::MalformedMetadata(format!(
                    "type {i} is a compact of non-integer type {inner}"
                )));
            }
            // Variant indices are unique
            TypeDef::Variant(v) => {
                for (n, a) in v.iter().enumerate() {
                    if v[..n].iter().any(|b| b.index == a.index) {
                        return Err(RegistryError::MalformedMetadata(format!(
                            "type {i} has duplicate variant index {}",
                            a.index
                        )));
                    }
                }
            }
            _ => (),
        }
    }

    for (n, p) in pallets.iter().enumerate() {
        if pallets[..n].iter().any(|q| q.index == p.index) {
            return Err(RegistryError::MalformedMetadata(format!(
                "duplicate pallet index {}",
                p.index
            )));
        }

        if let Some(c) = p.calls {
            match types.get(c as usize).map(|t| &t.def) {
                Some(TypeDef::Variant(_)) => (),
                _ => {
                    return Err(RegistryError::MalformedMetadata(format!(
                        "pallet {} calls type {c} is not a variant",
                        p.name
                    )))
                }
            }
        }
    }

    Ok(())
}

/// Resolve the integer primitive behind a compact type, unwrapping
/// single-field composites (eg. `Perbill(u32)`)
pub(crate) fn compact_target(types: &[TypeEntry], mut id: TypeId) -> Option<Primitive> {
    for _ in 0..=types.len() {
        match &types.get(id as usize)?.def {
            TypeDef::Primitive(p) if p.is_unsigned() => return Some(*p),
            TypeDef::Composite(f) if f.len() == 1 => id = f[0].ty,
            TypeDef::Tuple(t) if t.len() == 1 => id = t[0],
            _ => return None,
        }
    }
    None
}

/// Compute the minimum encoded size of every type via fixed-point iteration.
///
/// Types that never reach a value (unbounded recursion with no terminating
/// case) are rejected.
fn min_sizes(types: &[TypeEntry]) -> Result<Vec<u64>, RegistryError> {
    let mut sizes: Vec<Option<u64>> = vec![None; types.len()];

    fn sum(sizes: &[Option<u64>], ids: impl Iterator<Item = TypeId>) -> Option<u64> {
        let mut acc = 0u64;
        for t in ids {
            acc = acc.saturating_add(sizes[t as usize]?);
        }
        Some(acc)
    }

    // Sizes only ever shrink once known, settling within two passes per type
    for _ in 0..=2 * types.len() + 1 {
        let mut changed = false;

        for (i, t) in types.iter().enumerate() {
            let s = match &t.def {
                TypeDef::Primitive(p) => Some(p.fixed_len().unwrap_or(1) as u64),
                TypeDef::Compact(_) | TypeDef::Sequence(_) => Some(1),
                TypeDef::Array { len: 0, .. } => Some(0),
                TypeDef::Array { len, ty } => {
                    sizes[*ty as usize].map(|s| s.saturating_mul(*len as u64))
                }
                TypeDef::Tuple(t) => sum(&sizes, t.iter().copied()),
                TypeDef::Composite(f) => sum(&sizes, f.iter().map(|f| f.ty)),
                TypeDef::Variant(v) if v.is_empty() => Some(1),
                TypeDef::Variant(v) => v
                    .iter()
                    .filter_map(|v| sum(&sizes, v.fields.iter().map(|f| f.ty)))
                    .min()
                    .map(|s| s.saturating_add(1)),
            };

            if s.is_some() && s != sizes[i] {
                sizes[i] = s;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    sizes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.ok_or_else(|| {
                RegistryError::MalformedMetadata(format!("type {i} has no finite encoding"))
            })
        })
        .collect()
}

/// Metadata lookup, implemented by the [Registry] and any collaborator
/// providing access to one
pub trait MetadataSource {
    /// Fetch the entry for an exact network and spec version
    fn entry(&self, network: &NetworkId, spec_version: u32)
        -> Result<Arc<RegistryEntry>, RegistryError>;

    /// Fetch the most recent entry for a network
    fn latest(&self, network: &NetworkId) -> Result<Arc<RegistryEntry>, RegistryError>;

    /// Fetch the most recent entry for every known network
    fn networks(&self) -> Vec<Arc<RegistryEntry>>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn entry(
        &self,
        network: &NetworkId,
        spec_version: u32,
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        T::entry(self, network, spec_version)
    }

    fn latest(&self, network: &NetworkId) -> Result<Arc<RegistryEntry>, RegistryError> {
        T::latest(self, network)
    }

    fn networks(&self) -> Vec<Arc<RegistryEntry>> {
        T::networks(self)
    }
}

/// Store of loaded registry entries, keyed by `(network, spec_version)`
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: BTreeMap<(NetworkId, u32), Arc<RegistryEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, validate and insert a metadata blob
    pub fn load(
        &mut self,
        network: NetworkId,
        raw: &[u8],
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        let e = RegistryEntry::load(network, raw)?;
        self.insert(e)
    }

    /// Insert a validated entry.
    ///
    /// Existing entries are never replaced, re-inserting an identical entry
    /// is a no-op.
    pub fn insert(&mut self, entry: RegistryEntry) -> Result<Arc<RegistryEntry>, RegistryError> {
        let key = (entry.network_id, entry.spec_version);

        if let Some(e) = self.entries.get(&key) {
            if **e == entry {
                return Ok(e.clone());
            }

            #[cfg(feature = "log")]
            log::warn!(
                "refusing to replace metadata for {} v{}",
                key.0,
                key.1
            );

            return Err(RegistryError::AlreadyLoaded {
                network: key.0,
                spec_version: key.1,
            });
        }

        let e = Arc::new(entry);
        self.entries.insert(key, e.clone());
        Ok(e)
    }

    /// Fetch an entry by exact network and spec version
    pub fn get(
        &self,
        network: &NetworkId,
        spec_version: u32,
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        if let Some(e) = self.entries.get(&(*network, spec_version)) {
            return Ok(e.clone());
        }

        let available = self.versions(network);
        if available.is_empty() {
            return Err(RegistryError::UnknownNetwork(*network));
        }

        Err(RegistryError::VersionMismatch {
            network: *network,
            requested: spec_version,
            available,
        })
    }

    /// List networks with loaded metadata
    pub fn network_ids(&self) -> Vec<NetworkId> {
        let mut n: Vec<_> = self.entries.keys().map(|(n, _)| *n).collect();
        n.dedup();
        n
    }

    /// List loaded versions for a network (ascending)
    pub fn versions(&self, network: &NetworkId) -> Vec<u32> {
        self.entries
            .range((*network, 0)..=(*network, u32::MAX))
            .map(|((_, v), _)| *v)
            .collect()
    }

    /// Remove an entry
    pub fn remove(&mut self, network: &NetworkId, spec_version: u32) -> Option<Arc<RegistryEntry>> {
        self.entries.remove(&(*network, spec_version))
    }
}

impl MetadataSource for Registry {
    fn entry(
        &self,
        network: &NetworkId,
        spec_version: u32,
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        self.get(network, spec_version)
    }

    fn latest(&self, network: &NetworkId) -> Result<Arc<RegistryEntry>, RegistryError> {
        self.entries
            .range((*network, 0)..=(*network, u32::MAX))
            .next_back()
            .map(|(_, e)| e.clone())
            .ok_or(RegistryError::UnknownNetwork(*network))
    }

    fn networks(&self) -> Vec<Arc<RegistryEntry>> {
        self.network_ids()
            .iter()
            .filter_map(|n| self.latest(n).ok())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use airgap_proto::Encryption;

    use super::*;

    const NET: NetworkId = NetworkId([0xe1; 32]);

    fn specs() -> NetworkSpecs {
        NetworkSpecs {
            name: "polkadot".to_string(),
            base58prefix: 0,
            decimals: 10,
            unit: "DOT".to_string(),
            encryption: Encryption::Sr25519,
        }
    }

    fn entry(version: u32, types: Vec<TypeEntry>) -> Result<RegistryEntry, RegistryError> {
        RegistryEntry::new(NET, version, specs(), types, vec![])
    }

    fn u8_type() -> TypeEntry {
        TypeEntry::new("u8", TypeDef::Primitive(Primitive::U8))
    }

    #[test]
    fn dangling_reference() {
        let r = entry(1, vec![u8_type(), TypeEntry::new("", TypeDef::Sequence(7))]);
        assert!(matches!(r, Err(RegistryError::MalformedMetadata(_))));
    }

    #[test]
    fn unbounded_recursion() {
        // struct A { a: A }
        let r = entry(
            1,
            vec![TypeEntry::new(
                "A",
                TypeDef::Composite(vec![Field::new(Some("a"), None, 0)]),
            )],
        );
        assert!(matches!(r, Err(RegistryError::MalformedMetadata(_))));

        // enum List { Nil, Cons(u8, List) } terminates
        let r = entry(
            1,
            vec![
                u8_type(),
                TypeEntry::new(
                    "List",
                    TypeDef::Variant(vec![
                        Variant {
                            index: 0,
                            name: "Nil".to_string(),
                            fields: vec![],
                        },
                        Variant {
                            index: 1,
                            name: "Cons".to_string(),
                            fields: vec![Field::new(None, None, 0), Field::new(None, None, 1)],
                        },
                    ]),
                ),
            ],
        )
        .unwrap();
        assert_eq!(r.min_size(1), 1);

        // Recursion through a sequence terminates with the empty sequence
        let r = entry(
            1,
            vec![
                TypeEntry::new("Tree", TypeDef::Composite(vec![Field::new(Some("c"), None, 1)])),
                TypeEntry::new("", TypeDef::Sequence(0)),
            ],
        );
        assert!(r.is_ok());
    }

    #[test]
    fn min_sizes() {
        let e = entry(
            1,
            vec![
                u8_type(),
                TypeEntry::new("", TypeDef::Array { len: 32, ty: 0 }),
                TypeEntry::new("", TypeDef::Tuple(vec![1, 0, 3])),
                TypeEntry::new("", TypeDef::Compact(0)),
                TypeEntry::new("", TypeDef::Primitive(Primitive::Str)),
                TypeEntry::new(
                    "Pair",
                    TypeDef::Composite(vec![Field::new(Some("a"), None, 2), Field::new(Some("b"), None, 0)]),
                ),
                TypeEntry::new(
                    "Either",
                    TypeDef::Variant(vec![
                        Variant {
                            index: 0,
                            name: "Long".to_string(),
                            fields: vec![Field::new(None, None, 5)],
                        },
                        Variant {
                            index: 1,
                            name: "Short".to_string(),
                            fields: vec![Field::new(None, None, 1)],
                        },
                    ]),
                ),
            ],
        )
        .unwrap();

        assert_eq!(e.min_size(0), 1);
        assert_eq!(e.min_size(1), 32);
        assert_eq!(e.min_size(2), 34);
        assert_eq!(e.min_size(4), 1);
        assert_eq!(e.min_size(5), 35);
        assert_eq!(e.min_size(6), 33);
    }

    #[test]
    fn compact_targets() {
        let r = entry(
            1,
            vec![
                TypeEntry::new("", TypeDef::Primitive(Primitive::Bool)),
                TypeEntry::new("", TypeDef::Compact(0)),
            ],
        );
        assert!(matches!(r, Err(RegistryError::MalformedMetadata(_))));

        let r = entry(
            1,
            vec![
                TypeEntry::new("", TypeDef::Primitive(Primitive::U32)),
                TypeEntry::new("Perbill", TypeDef::Composite(vec![Field::new(None, None, 0)])),
                TypeEntry::new("", TypeDef::Compact(1)),
            ],
        );
        assert!(r.is_ok());
    }

    #[test]
    fn duplicate_indices() {
        let v = |index| Variant {
            index,
            name: format!("v{index}"),
            fields: vec![],
        };
        let r = entry(1, vec![TypeEntry::new("", TypeDef::Variant(vec![v(1), v(2), v(1)]))]);
        assert!(matches!(r, Err(RegistryError::MalformedMetadata(_))));

        let p = |index| Pallet {
            name: format!("p{index}"),
            index,
            calls: None,
        };
        let r = RegistryEntry::new(NET, 1, specs(), vec![], vec![p(0), p(0)]);
        assert!(matches!(r, Err(RegistryError::MalformedMetadata(_))));
    }

    #[test]
    fn lookup() {
        let e = entry(1, vec![u8_type()]).unwrap();
        assert_eq!(e.lookup(0).unwrap().def, TypeDef::Primitive(Primitive::U8));
        assert_eq!(e.lookup(1), Err(RegistryError::UnknownType(1)));
    }

    #[test]
    fn exact_version_match() {
        let mut r = Registry::new();

        r.insert(entry(9100, vec![u8_type()]).unwrap()).unwrap();
        r.insert(entry(9300, vec![u8_type()]).unwrap()).unwrap();

        assert_eq!(r.get(&NET, 9300).unwrap().spec_version(), 9300);
        assert_eq!(
            r.get(&NET, 9200),
            Err(RegistryError::VersionMismatch {
                network: NET,
                requested: 9200,
                available: vec![9100, 9300]
            })
        );
        assert_eq!(
            r.get(&NetworkId([0u8; 32]), 9300),
            Err(RegistryError::UnknownNetwork(NetworkId([0u8; 32])))
        );

        assert_eq!(r.latest(&NET).unwrap().spec_version(), 9300);
        assert_eq!(r.networks().len(), 1);
        assert_eq!(r.network_ids(), vec![NET]);
    }

    #[test]
    fn entries_are_immutable() {
        let mut r = Registry::new();

        let a = entry(1, vec![u8_type()]).unwrap();
        r.insert(a.clone()).unwrap();

        // Identical reload is fine
        r.insert(a.clone()).unwrap();

        // Different content for the same version is refused
        let b = entry(1, vec![u8_type(), u8_type()]).unwrap();
        assert_eq!(
            r.insert(b),
            Err(RegistryError::AlreadyLoaded {
                network: NET,
                spec_version: 1
            })
        );
        assert_eq!(*r.get(&NET, 1).unwrap(), a);

        // Removal
        assert!(r.remove(&NET, 1).is_some());
        assert_eq!(r.versions(&NET), Vec::<u32>::new());
    }

    #[test]
    fn load_encoded() {
        let e = entry(7, vec![u8_type(), TypeEntry::new("", TypeDef::Sequence(0))]).unwrap();
        let raw = e.encode();

        let mut r = Registry::new();
        let loaded = r.load(NET, &raw).unwrap();
        assert_eq!(*loaded, e);
    }
}
