// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Seed storage, key derivation and address book
//!
//! The [KeyVault] exclusively owns seed entropy. Keys are never stored, a
//! [DerivedKey] holds only a [SeedHandle] and path and is recomputed from the
//! seed whenever it is used, so deleting a seed invalidates every key derived
//! from it. Exporting entropy or signing requires a fresh [AuthProof] checked
//! by the collaborator-supplied [Authenticator].

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use airgap_proto::Encryption;
use bip39::{Language, Mnemonic, MnemonicType};
use sha2::{Digest as _, Sha512_256};
use zeroize::Zeroizing;

use crate::{
    helpers::fmt_hex,
    registry::{NetworkId, NetworkSpecs, RegistryEntry},
    signer,
};

mod keys;
pub use keys::{KeyPair, MultiSigner, Signature};

mod path;
pub use path::{
    check_derivation_format, suggest_n_plus_one, suggest_path_name, DerivationPath, Junction,
};

/// Supported phrase lengths
pub const WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Maximum number of word suggestions returned by [guess]
pub const MAX_WORD_GUESSES: usize = 8;

/// Suggest BIP-39 English words starting with a prefix, for phrase entry
pub fn guess(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return vec![];
    }

    let words = Language::English.wordlist().get_words_by_prefix(&prefix);
    words.iter().take(MAX_WORD_GUESSES).copied().collect()
}

/// Key vault errors
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum VaultError {
    #[error("seed name '{0}' already in use")]
    DuplicateName(String),
    #[error("invalid seed name")]
    InvalidName,
    #[error("unknown seed")]
    UnknownSeed,
    #[error("authentication required")]
    AuthRequired,
    #[error("password required")]
    PasswordRequired,
    #[error("incorrect password")]
    WrongPassword,
    #[error("invalid derivation path")]
    InvalidPath,
    #[error("invalid seed phrase")]
    InvalidPhrase,
    #[error("invalid seed entropy")]
    InvalidEntropy,
    #[error("unsupported word count ({0})")]
    UnsupportedWordCount(usize),
    #[error("soft derivation is not supported for {0}")]
    UnsupportedDerivation(Encryption),
    #[error("key already derived from seed '{seed_name}' with a different path")]
    KeyCollision { seed_name: String },
    #[error("unknown address")]
    UnknownAddress,
    #[error("invalid key")]
    InvalidKey,
    #[error("signing failed")]
    SigningFailed,
    #[error("vault unavailable")]
    Unavailable,
}

impl VaultError {
    /// Errors caused by user input that may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::AuthRequired | VaultError::PasswordRequired | VaultError::WrongPassword
        )
    }
}

/// Handle to a seed within a [KeyVault], never reused once the seed is deleted
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SeedHandle(u32);

/// Key derived from a seed, recomputed from the seed on use
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DerivedKey {
    pub seed: SeedHandle,
    /// Derivation path without password
    pub path: String,
    pub has_pwd: bool,
    pub public: MultiSigner,
}

impl DerivedKey {
    pub fn encryption(&self) -> Encryption {
        self.public.encryption()
    }
}

/// Address book entry
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AddressDetails {
    pub seed: SeedHandle,
    pub seed_name: String,
    pub path: String,
    pub has_pwd: bool,
    /// Networks this address is enabled for
    pub networks: Vec<NetworkId>,
}

impl AddressDetails {
    /// Derived key for this address
    pub fn key(&self, public: MultiSigner) -> DerivedKey {
        DerivedKey {
            seed: self.seed,
            path: self.path.clone(),
            has_pwd: self.has_pwd,
            public,
        }
    }
}

/// Authentication proof supplied by the collaborator UI (pin, passphrase, token)
#[derive(Clone, PartialEq)]
pub struct AuthProof(Zeroizing<Vec<u8>>);

impl AuthProof {
    pub fn new(proof: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(proof.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for AuthProof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AuthProof(..)")
    }
}

/// Verifies authentication proofs, provided by the hosting environment
pub trait Authenticator: Send + Sync {
    fn verify(&self, proof: &AuthProof) -> bool;
}

/// [Authenticator] comparing proofs against a hashed pin
pub struct PinAuthenticator {
    hash: [u8; 32],
}

impl PinAuthenticator {
    pub fn new(pin: &str) -> Self {
        Self {
            hash: Sha512_256::digest(pin.as_bytes()).into(),
        }
    }
}

impl Authenticator for PinAuthenticator {
    fn verify(&self, proof: &AuthProof) -> bool {
        let h: [u8; 32] = Sha512_256::digest(proof.as_bytes()).into();

        h.iter().zip(self.hash.iter()).fold(0u8, |a, (x, y)| a | (x ^ y)) == 0
    }
}

struct Seed {
    name: String,
    entropy: Zeroizing<Vec<u8>>,
}

#[derive(Default)]
struct SeedStore {
    next: u32,
    seeds: BTreeMap<SeedHandle, Seed>,
    addresses: BTreeMap<MultiSigner, AddressDetails>,
}

impl SeedStore {
    fn seed(&self, handle: SeedHandle) -> Result<&Seed, VaultError> {
        self.seeds.get(&handle).ok_or(VaultError::UnknownSeed)
    }

    fn derive(
        &self,
        handle: SeedHandle,
        path: &DerivationPath,
        encryption: Encryption,
    ) -> Result<KeyPair, VaultError> {
        let seed = self.seed(handle)?;
        KeyPair::derive(&seed.entropy, path, encryption)
    }
}

/// Key vault, owns seed entropy and the address book
pub struct KeyVault {
    store: Mutex<SeedStore>,
    auth: Box<dyn Authenticator>,
}

impl KeyVault {
    /// Create an empty vault using the provided authenticator
    pub fn new(auth: impl Authenticator + 'static) -> Self {
        Self {
            store: Mutex::new(SeedStore::default()),
            auth: Box::new(auth),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, SeedStore>, VaultError> {
        self.store.lock().map_err(|_| VaultError::Unavailable)
    }

    /// Check an authentication proof
    pub fn authenticate(&self, proof: &AuthProof) -> Result<(), VaultError> {
        match self.auth.verify(proof) {
            true => Ok(()),
            false => Err(VaultError::AuthRequired),
        }
    }

    /// Import a seed from raw BIP-39 entropy
    pub fn import_seed(&self, name: &str, entropy: &[u8]) -> Result<SeedHandle, VaultError> {
        if name.trim().is_empty() {
            return Err(VaultError::InvalidName);
        }
        if !matches!(entropy.len(), 16 | 20 | 24 | 28 | 32) {
            return Err(VaultError::InvalidEntropy);
        }

        let mut store = self.store()?;
        if store.seeds.values().any(|s| s.name == name) {
            return Err(VaultError::DuplicateName(name.to_string()));
        }

        let handle = SeedHandle(store.next);
        store.next += 1;
        store.seeds.insert(
            handle,
            Seed {
                name: name.to_string(),
                entropy: Zeroizing::new(entropy.to_vec()),
            },
        );

        #[cfg(feature = "log")]
        log::debug!("imported seed '{}' ({:?})", name, handle);

        Ok(handle)
    }

    /// Import a seed from a BIP-39 phrase
    pub fn import_phrase(&self, name: &str, phrase: &str) -> Result<SeedHandle, VaultError> {
        let m = Mnemonic::from_phrase(phrase.trim(), Language::English)
            .map_err(|_| VaultError::InvalidPhrase)?;
        self.import_seed(name, m.entropy())
    }

    /// Generate a new random phrase with the provided word count
    pub fn generate_phrase(words: usize) -> Result<Zeroizing<String>, VaultError> {
        let t = MnemonicType::for_word_count(words)
            .map_err(|_| VaultError::UnsupportedWordCount(words))?;
        let m = Mnemonic::new(t, Language::English);
        Ok(Zeroizing::new(m.into_phrase()))
    }

    /// Find a seed by name
    pub fn seed_by_name(&self, name: &str) -> Result<SeedHandle, VaultError> {
        let store = self.store()?;
        store
            .seeds
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(h, _)| *h)
            .ok_or(VaultError::UnknownSeed)
    }

    /// List seed handles and names
    pub fn seeds(&self) -> Result<Vec<(SeedHandle, String)>, VaultError> {
        let store = self.store()?;
        Ok(store
            .seeds
            .iter()
            .map(|(h, s)| (*h, s.name.clone()))
            .collect())
    }

    /// Derive a key from a seed, the path may include a `///password`
    pub fn derive(
        &self,
        seed: SeedHandle,
        path: &str,
        encryption: Encryption,
    ) -> Result<DerivedKey, VaultError> {
        let p = DerivationPath::parse(path)?;

        let store = self.store()?;
        let k = store.derive(seed, &p, encryption)?;

        Ok(DerivedKey {
            seed,
            path: p.path().to_string(),
            has_pwd: p.has_password(),
            public: k.public(),
        })
    }

    /// Sign a message with a derived key, requires a fresh authentication proof
    /// and the derivation password for password-protected keys
    pub fn sign(
        &self,
        key: &DerivedKey,
        password: Option<&str>,
        proof: &AuthProof,
        message: &[u8],
    ) -> Result<Signature, VaultError> {
        self.authenticate(proof)?;

        if key.has_pwd && password.is_none() {
            return Err(VaultError::PasswordRequired);
        }

        let p = DerivationPath::parse(&key.path)?.with_password(password);

        let store = self.store()?;
        let k = store.derive(key.seed, &p, key.encryption())?;

        // A mismatched key means the password was wrong
        if k.public() != key.public {
            return Err(match key.has_pwd {
                true => VaultError::WrongPassword,
                false => VaultError::InvalidKey,
            });
        }

        signer::sign(&k, message).map_err(|_| VaultError::SigningFailed)
    }

    /// Export seed entropy, requires a fresh authentication proof
    pub fn export_entropy(
        &self,
        seed: SeedHandle,
        proof: &AuthProof,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        self.authenticate(proof)?;

        let store = self.store()?;
        let s = store.seed(seed)?;

        #[cfg(feature = "log")]
        log::warn!("exporting seed '{}'", s.name);

        Ok(s.entropy.clone())
    }

    /// Export seed as a BIP-39 phrase, requires a fresh authentication proof
    pub fn export_phrase(
        &self,
        seed: SeedHandle,
        proof: &AuthProof,
    ) -> Result<Zeroizing<String>, VaultError> {
        let e = self.export_entropy(seed, proof)?;
        let m = Mnemonic::from_entropy(&e, Language::English)
            .map_err(|_| VaultError::InvalidEntropy)?;
        Ok(Zeroizing::new(m.into_phrase()))
    }

    /// Delete a seed, wiping its entropy and removing its addresses
    pub fn delete(&self, seed: SeedHandle) -> Result<(), VaultError> {
        let mut store = self.store()?;

        let s = store.seeds.remove(&seed).ok_or(VaultError::UnknownSeed)?;
        store.addresses.retain(|_, a| a.seed != seed);

        #[cfg(feature = "log")]
        log::debug!("deleted seed '{}'", s.name);

        drop(s);

        Ok(())
    }

    /// Derive and record an address for a network
    pub fn create_address(
        &self,
        seed: SeedHandle,
        path: &str,
        network: &NetworkId,
        specs: &NetworkSpecs,
    ) -> Result<MultiSigner, VaultError> {
        let p = DerivationPath::parse(path)?;

        let mut store = self.store()?;
        let public = store.derive(seed, &p, specs.encryption)?.public();
        let seed_name = store.seed(seed)?.name.clone();

        match store.addresses.get_mut(&public) {
            Some(a) if a.seed != seed || a.path != p.path() => {
                return Err(VaultError::KeyCollision {
                    seed_name: a.seed_name.clone(),
                })
            }
            Some(a) => {
                if !a.networks.contains(network) {
                    a.networks.push(*network);
                }
            }
            None => {
                store.addresses.insert(
                    public,
                    AddressDetails {
                        seed,
                        seed_name,
                        path: p.path().to_string(),
                        has_pwd: p.has_password(),
                        networks: vec![*network],
                    },
                );
            }
        }

        Ok(public)
    }

    /// Create the root address and default derivations for each network,
    /// `{network}` in a template is replaced by the lower-case network name
    pub fn populate_defaults(
        &self,
        seed: SeedHandle,
        networks: &[Arc<RegistryEntry>],
        templates: &[String],
    ) -> Result<Vec<MultiSigner>, VaultError> {
        let mut created = vec![];

        for n in networks {
            let specs = n.specs();
            let name = specs.name.to_lowercase();

            for t in templates {
                let path = t.replace("{network}", &name);

                match self.create_address(seed, &path, n.network_id(), specs) {
                    Ok(k) => created.push(k),
                    // Root key collisions are fatal, other defaults are skipped
                    Err(e) if path.is_empty() => return Err(e),
                    Err(_e) => {
                        #[cfg(feature = "log")]
                        log::warn!("skipping default path '{}': {}", path, _e);
                    }
                }
            }
        }

        Ok(created)
    }

    /// Remove an address from a network, dropping the entry once no networks remain
    pub fn remove_address(&self, key: &MultiSigner, network: &NetworkId) -> Result<(), VaultError> {
        let mut store = self.store()?;

        let a = store
            .addresses
            .get_mut(key)
            .ok_or(VaultError::UnknownAddress)?;
        a.networks.retain(|n| n != network);

        if a.networks.is_empty() {
            store.addresses.remove(key);
        }

        Ok(())
    }

    /// List addresses derived from a seed
    pub fn addresses_for_seed(
        &self,
        seed: SeedHandle,
    ) -> Result<Vec<(MultiSigner, AddressDetails)>, VaultError> {
        let store = self.store()?;
        store.seed(seed)?;

        Ok(store
            .addresses
            .iter()
            .filter(|(_, a)| a.seed == seed)
            .map(|(k, a)| (*k, a.clone()))
            .collect())
    }

    /// Find the address book entry for a public key
    pub fn lookup(&self, key: &MultiSigner) -> Result<Option<AddressDetails>, VaultError> {
        let store = self.store()?;
        Ok(store.addresses.get(key).cloned())
    }

    /// Find the address book entry for a public key enabled on a network
    pub fn lookup_on(
        &self,
        key: &MultiSigner,
        network: &NetworkId,
    ) -> Result<Option<AddressDetails>, VaultError> {
        let store = self.store()?;
        Ok(store
            .addresses
            .get(key)
            .filter(|a| a.networks.contains(network))
            .cloned())
    }

    /// Export an address in the `substrate:<ss58>:0x<genesis>` form read by
    /// wallets, the address must be enabled on the network
    pub fn export_address(
        &self,
        key: &MultiSigner,
        network: &NetworkId,
        specs: &NetworkSpecs,
    ) -> Result<String, VaultError> {
        if key.encryption() != specs.encryption {
            return Err(VaultError::UnknownAddress);
        }
        if self.lookup_on(key, network)?.is_none() {
            return Err(VaultError::UnknownAddress);
        }

        Ok(format!(
            "substrate:{}:{}",
            key.to_ss58(specs.base58prefix),
            fmt_hex(network.as_bytes())
        ))
    }

    /// Suggest the next free `//N` child of a path for a seed and network
    pub fn suggest_n_plus_one(
        &self,
        seed: SeedHandle,
        path: &str,
        network: &NetworkId,
    ) -> Result<String, VaultError> {
        let store = self.store()?;
        store.seed(seed)?;

        let paths = store
            .addresses
            .values()
            .filter(|a| a.seed == seed && a.networks.contains(network))
            .map(|a| a.path.as_str());

        Ok(path::suggest_n_plus_one(path, paths))
    }
}
