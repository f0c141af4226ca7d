//! Decoder properties over the sample metadata

use proptest::prelude::*;

use airgap_core::{
    decode::{covers, decode_request, decode_transaction, DecoderLimits, Request, MAX_UNHASHED_LEN},
    registry::Registry,
    vault::MultiSigner,
};
use airgap_tests::{
    metadata,
    request::{self, calls, Extensions},
};

lazy_static::lazy_static! {
    static ref REGISTRY: Registry = {
        let mut r = Registry::new();
        r.insert(metadata::westend()).unwrap();
        r
    };
}

const SIGNER: MultiSigner = MultiSigner::Sr25519([0x11; 32]);

fn transaction(call: &[u8]) -> Vec<u8> {
    let n = &metadata::WESTEND;
    request::transaction(&SIGNER, call, &Extensions::new(n).mortal(), n)
}

/// Arbitrary well-formed calls
fn any_call() -> impl Strategy<Value = Vec<u8>> {
    let leaf = prop_oneof![
        (any::<[u8; 32]>(), any::<u128>()).prop_map(|(d, v)| calls::transfer(&d, v)),
        prop::collection::vec(any::<u8>(), 0..600).prop_map(|r| calls::remark(&r)),
        any::<u64>().prop_map(|p| calls::system(1, &p.to_le_bytes())),
    ]
    .boxed();

    prop_oneof![
        leaf.clone(),
        prop::collection::vec(leaf, 0..4).prop_map(|c| calls::batch(&c)),
    ]
}

proptest! {
    #[test]
    fn decode_is_deterministic_and_total(call in any_call()) {
        let p = transaction(&call);
        let l = DecoderLimits::default();

        let a = decode_request(&p, &*REGISTRY, &l).unwrap();
        let b = decode_request(&p, &*REGISTRY, &l).unwrap();

        prop_assert_eq!(&a, &b);
        prop_assert!(covers(&a.cards, p.len()));
    }

    #[test]
    fn long_transactions_sign_hash(call in any_call()) {
        let p = transaction(&call);
        let r = decode_transaction(&p, &*REGISTRY, &DecoderLimits::default()).unwrap();

        let signable = match r.request {
            Request::Sign { payload, .. } => payload,
            _ => unreachable!(),
        };

        // Call and extensions
        let n = call.len() + 2 + 1 + 1 + 4 + 4 + 32 + 32;
        match n > MAX_UNHASHED_LEN {
            true => prop_assert_eq!(signable.len(), 32),
            false => prop_assert_eq!(signable.len(), n),
        }
    }

    #[test]
    fn arbitrary_calls_never_panic(call in prop::collection::vec(any::<u8>(), 0..256)) {
        let p = transaction(&call);
        let l = DecoderLimits::default();

        match decode_request(&p, &*REGISTRY, &l) {
            Ok(r) => prop_assert!(covers(&r.cards, p.len())),
            Err(e) => {
                prop_assert!(e.offset <= p.len());
                prop_assert_eq!(decode_request(&p, &*REGISTRY, &l), Err(e));
            }
        }
    }

    #[test]
    fn arbitrary_payloads_never_panic(p in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_request(&p, &*REGISTRY, &DecoderLimits::default());
    }
}

#[test]
fn nested_batch_cards() {
    let inner = vec![calls::remark(b"one"), calls::transfer(&[0x22; 32], 5)];
    let call = calls::batch(&[calls::batch(&inner), calls::remark(b"two")]);
    let p = transaction(&call);

    let r = decode_request(&p, &*REGISTRY, &DecoderLimits::default()).unwrap();
    assert!(covers(&r.cards, p.len()));

    let mut values = vec![];
    r.cards[1].walk(&mut |c| values.push((c.indent, c.value.clone())));

    assert_eq!(values[0], (0, "Utility".to_string()));
    assert_eq!(values[1], (1, "batch".to_string()));
    assert!(values.contains(&(2, "calls".to_string())));
    assert!(values.iter().any(|(_, v)| v == "2 items"));
    assert!(values.iter().any(|(_, v)| v == "0x6f6e65"));
}
