// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Key types and hierarchical derivation
//!
//! All schemes start from the BIP-39 seed `PBKDF2(entropy, "mnemonic" | password)`,
//! the first 32 bytes of which form the root secret. Sr25519 supports hard and
//! soft junctions, Ed25519 and ECDSA only hard junctions, each computed as
//! `blake2_256(SCALE(("<Scheme>HDKD", secret, chain_code)))`.

use core::fmt;

use airgap_proto::{compact::encode_compact, Encryption};
use schnorrkel::{derive::{ChainCode, Derivation}, ExpansionMode, MiniSecretKey};
use zeroize::Zeroizing;

use super::{
    path::{DerivationPath, Junction},
    VaultError,
};
use crate::helpers::{blake2_256, fmt_hex, ss58_encode};

const ED25519_HDKD: &[u8] = b"Ed25519HDKD";
const ECDSA_HDKD: &[u8] = b"Secp256k1HDKD";

/// Public key tagged with its signature scheme
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MultiSigner {
    Ed25519([u8; 32]),
    Sr25519([u8; 32]),
    /// Compressed SEC1 point
    Ecdsa([u8; 33]),
}

impl MultiSigner {
    /// Build a public key from raw bytes, checking the length matches the scheme
    pub fn from_parts(encryption: Encryption, key: &[u8]) -> Option<Self> {
        match encryption {
            Encryption::Ed25519 => key.try_into().ok().map(MultiSigner::Ed25519),
            Encryption::Sr25519 => key.try_into().ok().map(MultiSigner::Sr25519),
            Encryption::Ecdsa => key.try_into().ok().map(MultiSigner::Ecdsa),
            Encryption::Unsigned => None,
        }
    }

    pub fn encryption(&self) -> Encryption {
        match self {
            MultiSigner::Ed25519(_) => Encryption::Ed25519,
            MultiSigner::Sr25519(_) => Encryption::Sr25519,
            MultiSigner::Ecdsa(_) => Encryption::Ecdsa,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MultiSigner::Ed25519(k) | MultiSigner::Sr25519(k) => k,
            MultiSigner::Ecdsa(k) => k,
        }
    }

    /// SS58 address for the provided network prefix
    pub fn to_ss58(&self, prefix: u16) -> String {
        ss58_encode(prefix, self.as_bytes())
    }
}

impl fmt::Display for MultiSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.encryption(), fmt_hex(self.as_bytes()))
    }
}

impl fmt::Debug for MultiSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Signature tagged with its scheme
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Signature {
    Ed25519([u8; 64]),
    Sr25519([u8; 64]),
    /// Recoverable `r | s | v`
    Ecdsa([u8; 65]),
}

impl Signature {
    /// Build a signature from raw bytes, checking the length matches the scheme
    pub fn from_parts(encryption: Encryption, sig: &[u8]) -> Option<Self> {
        match encryption {
            Encryption::Ed25519 => sig.try_into().ok().map(Signature::Ed25519),
            Encryption::Sr25519 => sig.try_into().ok().map(Signature::Sr25519),
            Encryption::Ecdsa => sig.try_into().ok().map(Signature::Ecdsa),
            Encryption::Unsigned => None,
        }
    }

    pub fn encryption(&self) -> Encryption {
        match self {
            Signature::Ed25519(_) => Encryption::Ed25519,
            Signature::Sr25519(_) => Encryption::Sr25519,
            Signature::Ecdsa(_) => Encryption::Ecdsa,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Signature::Ed25519(s) | Signature::Sr25519(s) => s,
            Signature::Ecdsa(s) => s,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.encryption(), fmt_hex(self.as_bytes()))
    }
}

/// Derived private key
pub enum KeyPair {
    Ed25519(ed25519_dalek::SigningKey),
    Sr25519(schnorrkel::Keypair),
    Ecdsa(k256::ecdsa::SigningKey),
}

impl KeyPair {
    /// Derive a key pair from seed entropy along the provided path
    pub fn derive(
        entropy: &[u8],
        path: &DerivationPath,
        encryption: Encryption,
    ) -> Result<Self, VaultError> {
        let seed = substrate_bip39::seed_from_entropy(entropy, path.password().unwrap_or(""))
            .map_err(|_| VaultError::InvalidEntropy)?;
        let seed = Zeroizing::new(seed);

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&seed[..32]);

        match encryption {
            Encryption::Sr25519 => derive_sr25519(&secret, path.junctions()),
            Encryption::Ed25519 => {
                let s = derive_hard(ED25519_HDKD, secret, path.junctions(), encryption)?;
                Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(&s)))
            }
            Encryption::Ecdsa => {
                let s = derive_hard(ECDSA_HDKD, secret, path.junctions(), encryption)?;
                k256::ecdsa::SigningKey::from_slice(&s[..])
                    .map(KeyPair::Ecdsa)
                    .map_err(|_| VaultError::InvalidKey)
            }
            Encryption::Unsigned => Err(VaultError::InvalidKey),
        }
    }

    pub fn encryption(&self) -> Encryption {
        match self {
            KeyPair::Ed25519(_) => Encryption::Ed25519,
            KeyPair::Sr25519(_) => Encryption::Sr25519,
            KeyPair::Ecdsa(_) => Encryption::Ecdsa,
        }
    }

    /// Fetch the public key for this pair
    pub fn public(&self) -> MultiSigner {
        match self {
            KeyPair::Ed25519(k) => MultiSigner::Ed25519(k.verifying_key().to_bytes()),
            KeyPair::Sr25519(k) => MultiSigner::Sr25519(k.public.to_bytes()),
            KeyPair::Ecdsa(k) => {
                let p = k.verifying_key().to_encoded_point(true);
                let mut b = [0u8; 33];
                b.copy_from_slice(p.as_bytes());
                MultiSigner::Ecdsa(b)
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({})", self.public())
    }
}

fn derive_sr25519(secret: &[u8; 32], junctions: &[Junction]) -> Result<KeyPair, VaultError> {
    let mini = MiniSecretKey::from_bytes(secret).map_err(|_| VaultError::InvalidKey)?;

    let mut key = mini.expand(ExpansionMode::Ed25519);
    for j in junctions {
        key = match j {
            Junction::Soft(cc) => key.derived_key_simple(ChainCode(*cc), b"").0,
            Junction::Hard(cc) => key
                .hard_derive_mini_secret_key(Some(ChainCode(*cc)), b"")
                .0
                .expand(ExpansionMode::Ed25519),
        };
    }

    Ok(KeyPair::Sr25519(key.to_keypair()))
}

fn derive_hard(
    domain: &[u8],
    mut secret: Zeroizing<[u8; 32]>,
    junctions: &[Junction],
    encryption: Encryption,
) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    for j in junctions {
        let cc = match j {
            Junction::Hard(cc) => cc,
            Junction::Soft(_) => return Err(VaultError::UnsupportedDerivation(encryption)),
        };

        let mut d = Zeroizing::new(Vec::with_capacity(domain.len() + 65));
        encode_compact(domain.len() as u128, &mut d);
        d.extend_from_slice(domain);
        d.extend_from_slice(&secret[..]);
        d.extend_from_slice(cc);

        *secret = blake2_256(&d);
    }

    Ok(secret)
}

#[cfg(test)]
mod test {
    use super::*;

    const PHRASE: &str = "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    fn entropy() -> Vec<u8> {
        bip39::Mnemonic::from_phrase(PHRASE, bip39::Language::English)
            .unwrap()
            .entropy()
            .to_vec()
    }

    fn public(path: &str, encryption: Encryption) -> String {
        let p = DerivationPath::parse(path).unwrap();
        let k = KeyPair::derive(&entropy(), &p, encryption).unwrap();
        hex::encode(k.public().as_bytes())
    }

    #[test]
    fn derive_known_keys() {
        let tests = &[
            (
                "",
                Encryption::Sr25519,
                "46ebddef8cd9bb167dc30878d7113b7e168e6f0646beffd77d69d39bad76b47a",
            ),
            (
                "//kusama",
                Encryption::Sr25519,
                "64a31235d4bf9b37cfed3afa8aa60754675f9c4915430454d365c05112784d05",
            ),
            (
                "//Alice",
                Encryption::Sr25519,
                "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d",
            ),
            (
                "//Alice",
                Encryption::Ed25519,
                "88dc3417d5058ec4b4503e0c12ea1a0a89be200fe98922423d4334014fa6b0ee",
            ),
            (
                "//Alice",
                Encryption::Ecdsa,
                "020a1091341fe5664bfa1782d5e04779689068c916b04cb365ec3153755684d9a1",
            ),
        ];

        for (path, encryption, key) in tests {
            assert_eq!(&public(path, *encryption), key, "{encryption} {path}");
        }
    }

    #[test]
    fn soft_derivation() {
        // Soft junctions are deterministic for sr25519
        assert_eq!(
            public("//Alice/soft", Encryption::Sr25519),
            public("//Alice/soft", Encryption::Sr25519)
        );
        assert_ne!(
            public("//Alice/soft", Encryption::Sr25519),
            public("//Alice//soft", Encryption::Sr25519)
        );

        // And unsupported elsewhere
        let p = DerivationPath::parse("//Alice/soft").unwrap();
        for e in [Encryption::Ed25519, Encryption::Ecdsa] {
            assert_eq!(
                KeyPair::derive(&entropy(), &p, e).map(|k| k.public()),
                Err(VaultError::UnsupportedDerivation(e))
            );
        }
    }

    #[test]
    fn password_changes_key() {
        assert_ne!(
            public("//Alice", Encryption::Sr25519),
            public("//Alice///pwd", Encryption::Sr25519)
        );
    }

    #[test]
    fn parts_lengths() {
        assert!(MultiSigner::from_parts(Encryption::Sr25519, &[0u8; 32]).is_some());
        assert!(MultiSigner::from_parts(Encryption::Ecdsa, &[0u8; 32]).is_none());
        assert!(MultiSigner::from_parts(Encryption::Unsigned, &[]).is_none());
        assert!(Signature::from_parts(Encryption::Ecdsa, &[0u8; 65]).is_some());
        assert!(Signature::from_parts(Encryption::Ed25519, &[0u8; 65]).is_none());
    }
}
