// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Sample runtime metadata

use airgap_core::registry::{
    Field, NetworkId, NetworkSpecs, Pallet, Primitive, RegistryEntry, TypeDef, TypeEntry, TypeId,
    Variant,
};
use airgap_proto::Encryption;

/// Sample network genesis hash
pub const WESTEND: NetworkId = NetworkId([
    0xe1, 0x43, 0xf2, 0x38, 0x03, 0xac, 0x50, 0xe8, 0xf6, 0xf8, 0xe6, 0x26, 0x95, 0xd1, 0xce, 0x9e,
    0x4e, 0x1d, 0x68, 0xaa, 0x36, 0xc1, 0xcd, 0x2c, 0xfd, 0x15, 0x34, 0x02, 0x13, 0xf3, 0x42, 0x3e,
]);

/// Second sample network genesis hash
pub const ROCOCO: NetworkId = NetworkId([0x6e; 32]);

/// Spec version of the sample metadata
pub const SPEC_VERSION: u32 = 9430;

/// System pallet index
pub const SYSTEM: u8 = 0;
/// Balances pallet index
pub const BALANCES: u8 = 4;
/// Utility pallet index
pub const UTILITY: u8 = 16;

/// System calls, indices `0..5`
pub const SYSTEM_CALLS: &[&str] = &[
    "remark",
    "set_heap_pages",
    "set_code",
    "set_code_without_checks",
    "remark_with_event",
];

/// Network specs for the sample network
pub fn westend_specs() -> NetworkSpecs {
    NetworkSpecs {
        name: "Westend".to_string(),
        base58prefix: 42,
        decimals: 12,
        unit: "WND".to_string(),
        encryption: Encryption::Sr25519,
    }
}

fn variant(index: u8, name: &str, fields: Vec<Field>) -> Variant {
    Variant {
        index,
        name: name.to_string(),
        fields,
    }
}

fn named(name: &str, type_name: &str, ty: TypeId) -> Field {
    Field::new(Some(name), Some(type_name), ty)
}

/// Sample type table with System, Balances and Utility pallets
pub fn types() -> Vec<TypeEntry> {
    use Primitive::*;

    vec![
        /* 0 */ TypeEntry::new("u8", TypeDef::Primitive(U8)),
        /* 1 */ TypeEntry::new("", TypeDef::Array { len: 32, ty: 0 }),
        /* 2 */
        TypeEntry::new(
            "sp_core::crypto::AccountId32",
            TypeDef::Composite(vec![Field::new(None, Some("[u8; 32]"), 1)]),
        ),
        /* 3 */ TypeEntry::new("u128", TypeDef::Primitive(U128)),
        /* 4 */ TypeEntry::new("", TypeDef::Compact(3)),
        /* 5 */
        TypeEntry::new(
            "sp_runtime::multiaddress::MultiAddress",
            TypeDef::Variant(vec![
                variant(0, "Id", vec![Field::new(None, Some("AccountId"), 2)]),
                variant(3, "Address32", vec![Field::new(None, Some("[u8; 32]"), 1)]),
            ]),
        ),
        /* 6 */
        TypeEntry::new(
            "pallet_balances::pallet::Call",
            TypeDef::Variant(vec![
                variant(
                    0,
                    "transfer_allow_death",
                    vec![
                        named("dest", "AccountIdLookupOf<T>", 5),
                        named("value", "T::Balance", 4),
                    ],
                ),
                variant(
                    3,
                    "transfer_keep_alive",
                    vec![
                        named("dest", "AccountIdLookupOf<T>", 5),
                        named("value", "T::Balance", 4),
                    ],
                ),
                variant(
                    4,
                    "transfer_all",
                    vec![
                        named("dest", "AccountIdLookupOf<T>", 5),
                        named("keep_alive", "bool", 8),
                    ],
                ),
            ]),
        ),
        /* 7 */ TypeEntry::new("", TypeDef::Sequence(0)),
        /* 8 */ TypeEntry::new("bool", TypeDef::Primitive(Bool)),
        /* 9 */
        TypeEntry::new(
            "frame_system::pallet::Call",
            TypeDef::Variant(vec![
                variant(0, SYSTEM_CALLS[0], vec![named("remark", "Vec<u8>", 7)]),
                variant(1, SYSTEM_CALLS[1], vec![named("pages", "u64", 10)]),
                variant(2, SYSTEM_CALLS[2], vec![named("code", "Vec<u8>", 7)]),
                variant(3, SYSTEM_CALLS[3], vec![named("code", "Vec<u8>", 7)]),
                variant(4, SYSTEM_CALLS[4], vec![named("remark", "Vec<u8>", 7)]),
            ]),
        ),
        /* 10 */ TypeEntry::new("u64", TypeDef::Primitive(U64)),
        /* 11 */
        TypeEntry::new(
            "westend_runtime::RuntimeCall",
            TypeDef::Variant(vec![
                variant(SYSTEM, "System", vec![Field::new(None, None, 9)]),
                variant(BALANCES, "Balances", vec![Field::new(None, None, 6)]),
                variant(UTILITY, "Utility", vec![Field::new(None, None, 13)]),
            ]),
        ),
        /* 12 */ TypeEntry::new("", TypeDef::Sequence(11)),
        /* 13 */
        TypeEntry::new(
            "pallet_utility::pallet::Call",
            TypeDef::Variant(vec![variant(
                0,
                "batch",
                vec![named("calls", "Vec<<T as Config>::RuntimeCall>", 12)],
            )]),
        ),
    ]
}

/// Pallets of the sample runtime
pub fn pallets() -> Vec<Pallet> {
    vec![
        Pallet {
            name: "System".to_string(),
            index: SYSTEM,
            calls: Some(9),
        },
        Pallet {
            name: "Balances".to_string(),
            index: BALANCES,
            calls: Some(6),
        },
        Pallet {
            name: "Utility".to_string(),
            index: UTILITY,
            calls: Some(13),
        },
    ]
}

/// Build the sample registry entry for a spec version
pub fn westend_at(spec_version: u32) -> RegistryEntry {
    match RegistryEntry::new(WESTEND, spec_version, westend_specs(), types(), pallets()) {
        Ok(e) => e,
        Err(e) => panic!("invalid sample metadata: {e}"),
    }
}

/// Build the sample registry entry
pub fn westend() -> RegistryEntry {
    westend_at(SPEC_VERSION)
}

/// Encoded sample metadata blob
pub fn westend_blob() -> Vec<u8> {
    westend().encode()
}

/// Build a registry entry for the second sample network, sharing the sample types
pub fn rococo() -> RegistryEntry {
    let specs = NetworkSpecs {
        name: "Rococo".to_string(),
        unit: "ROC".to_string(),
        ..westend_specs()
    };

    match RegistryEntry::new(ROCOCO, SPEC_VERSION, specs, types(), pallets()) {
        Ok(e) => e,
        Err(e) => panic!("invalid sample metadata: {e}"),
    }
}
