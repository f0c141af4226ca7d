#![allow(unused)]

use std::sync::{Arc, RwLock};

use log::debug;

use airgap_core::{
    engine::{Action, Driver, Engine, EngineConfig, SessionView},
    registry::{MetadataSource, NetworkId, Registry, RegistryEntry, RegistryError},
    vault::{KeyVault, MultiSigner, PinAuthenticator},
};
use airgap_proto::Encryption;
use airgap_tests::{metadata, Session, ALICE_PHRASE, PIN};

/// Driver with an in-memory registry and vault
pub struct TestDriver {
    pub registry: RwLock<Registry>,
    pub vault: KeyVault,
}

impl TestDriver {
    /// Create a driver with the sample metadata loaded
    pub fn new() -> Self {
        let mut registry = Registry::new();
        registry.insert(metadata::westend()).unwrap();

        Self {
            registry: RwLock::new(registry),
            vault: KeyVault::new(PinAuthenticator::new(PIN)),
        }
    }

    /// Import the development phrase and create an address
    pub fn with_alice(&self, path: &str) -> MultiSigner {
        let seed = match self.vault.seed_by_name("alice") {
            Ok(s) => s,
            Err(_) => self.vault.import_phrase("alice", ALICE_PHRASE).unwrap(),
        };

        self.vault
            .create_address(
                seed,
                path,
                &metadata::WESTEND,
                &metadata::westend_specs(),
            )
            .unwrap()
    }
}

impl MetadataSource for TestDriver {
    fn entry(
        &self,
        network: &NetworkId,
        spec_version: u32,
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        self.registry.read().unwrap().entry(network, spec_version)
    }

    fn latest(&self, network: &NetworkId) -> Result<Arc<RegistryEntry>, RegistryError> {
        self.registry.read().unwrap().latest(network)
    }

    fn networks(&self) -> Vec<Arc<RegistryEntry>> {
        self.registry.read().unwrap().networks()
    }
}

impl Driver for TestDriver {
    fn vault(&self) -> &KeyVault {
        &self.vault
    }

    fn store_metadata(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        self.registry.write().unwrap().insert(entry).map(|_| ())
    }
}

/// Engine wrapper implementing [Session]
pub struct TestEngine<'a> {
    pub engine: Engine<&'a TestDriver>,
}

impl<'a> TestEngine<'a> {
    pub fn new(drv: &'a TestDriver) -> Self {
        Self {
            engine: Engine::new(drv, EngineConfig::default()),
        }
    }
}

impl<'a> Session for TestEngine<'a> {
    fn apply(&mut self, action: Action) -> anyhow::Result<SessionView> {
        debug!("action: {}", action.kind());

        self.engine.update(&action)?;
        Ok(self.engine.view())
    }

    fn view(&self) -> anyhow::Result<SessionView> {
        Ok(self.engine.view())
    }
}
