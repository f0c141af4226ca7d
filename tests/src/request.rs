// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing request builders

use airgap_core::{
    registry::{NetworkId, RegistryEntry},
    vault::MultiSigner,
};
use airgap_proto::{
    compact::encode_compact,
    prelude::{Prelude, PRELUDE_LEN},
    Encryption, PayloadKind,
};
use encdec::Encode;

use crate::metadata::{BALANCES, SPEC_VERSION, SYSTEM, UTILITY};

fn prelude(encryption: Encryption, kind: PayloadKind) -> Vec<u8> {
    let mut b = vec![0u8; PRELUDE_LEN];
    if let Err(e) = Prelude::new(encryption, kind).encode(&mut b) {
        panic!("prelude encoding failed: {e:?}");
    }
    b
}

/// Transaction signed extensions
#[derive(Clone, PartialEq, Debug)]
pub struct Extensions {
    /// Encoded era
    pub era: Vec<u8>,
    pub nonce: u128,
    pub tip: u128,
    pub spec_version: u32,
    pub tx_version: u32,
    pub genesis: [u8; 32],
    pub block: [u8; 32],
}

impl Extensions {
    /// Immortal transaction extensions for a network
    pub fn new(network: &NetworkId) -> Self {
        Self {
            era: vec![0x00],
            nonce: 0,
            tip: 0,
            spec_version: SPEC_VERSION,
            tx_version: 24,
            genesis: *network.as_bytes(),
            block: *network.as_bytes(),
        }
    }

    /// Mortal era, period 64 phase 42
    pub fn mortal(mut self) -> Self {
        self.era = vec![0xa5, 0x02];
        self
    }

    pub fn nonce(mut self, nonce: u128) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn tip(mut self, tip: u128) -> Self {
        self.tip = tip;
        self
    }

    pub fn spec_version(mut self, v: u32) -> Self {
        self.spec_version = v;
        self
    }

    /// Append encoded extensions
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.era);
        encode_compact(self.nonce, out);
        encode_compact(self.tip, out);
        out.extend_from_slice(&self.spec_version.to_le_bytes());
        out.extend_from_slice(&self.tx_version.to_le_bytes());
        out.extend_from_slice(&self.genesis);
        out.extend_from_slice(&self.block);
    }
}

/// Build a transaction signing request
pub fn transaction(
    signer: &MultiSigner,
    call: &[u8],
    ext: &Extensions,
    network: &NetworkId,
) -> Vec<u8> {
    let mut p = prelude(signer.encryption(), PayloadKind::Transaction);
    p.extend_from_slice(signer.as_bytes());
    encode_compact(call.len() as u128, &mut p);
    p.extend_from_slice(call);
    ext.encode(&mut p);
    p.extend_from_slice(network.as_bytes());
    p
}

/// Build a message signing request
pub fn message(signer: &MultiSigner, msg: &[u8], network: &NetworkId) -> Vec<u8> {
    let mut p = prelude(signer.encryption(), PayloadKind::Message);
    p.extend_from_slice(signer.as_bytes());
    encode_compact(msg.len() as u128, &mut p);
    p.extend_from_slice(msg);
    p.extend_from_slice(network.as_bytes());
    p
}

/// Build a metadata update request
pub fn metadata_update(entry: &RegistryEntry) -> Vec<u8> {
    let mut p = prelude(Encryption::Unsigned, PayloadKind::LoadMetadata);
    p.extend_from_slice(entry.network_id().as_bytes());
    p.extend_from_slice(&entry.encode());
    p
}

/// Offset of the call within a transaction request
pub fn call_offset(signer: &MultiSigner, call_len: usize) -> usize {
    let mut n = vec![];
    encode_compact(call_len as u128, &mut n);
    PRELUDE_LEN + signer.as_bytes().len() + n.len()
}

/// Encoded runtime calls
pub mod calls {
    use super::*;

    /// `Balances::transfer_keep_alive` to an account id
    pub fn transfer(dest: &[u8; 32], value: u128) -> Vec<u8> {
        let mut c = vec![BALANCES, 3, 0x00];
        c.extend_from_slice(dest);
        encode_compact(value, &mut c);
        c
    }

    /// `System::remark`
    pub fn remark(data: &[u8]) -> Vec<u8> {
        let mut c = vec![SYSTEM, 0];
        encode_compact(data.len() as u128, &mut c);
        c.extend_from_slice(data);
        c
    }

    /// `Utility::batch` over encoded calls
    pub fn batch(calls: &[Vec<u8>]) -> Vec<u8> {
        let mut c = vec![UTILITY, 0];
        encode_compact(calls.len() as u128, &mut c);
        for i in calls {
            c.extend_from_slice(i);
        }
        c
    }

    /// System call with an arbitrary index and argument bytes
    pub fn system(index: u8, args: &[u8]) -> Vec<u8> {
        let mut c = vec![SYSTEM, index];
        c.extend_from_slice(args);
        c
    }
}
