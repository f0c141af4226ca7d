// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session host, shares one registry and key vault between independent
//! engine sessions
//!
//! Each session is locked independently, so actions on different sessions
//! proceed in parallel while actions on a single session are serialised.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::{debug, info};

use airgap_core::{
    engine::{Action, Driver, Engine, SessionView},
    registry::{MetadataSource, NetworkId, Registry, RegistryEntry, RegistryError},
    vault::{Authenticator, KeyVault, MultiSigner},
};

use crate::{Config, Error};

/// Session identifier, unique for the lifetime of a [Navigator]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared session resources, cheap to clone
#[derive(Clone)]
pub struct Context {
    registry: Arc<RwLock<Registry>>,
    vault: Arc<KeyVault>,
}

impl MetadataSource for Context {
    fn entry(
        &self,
        network: &NetworkId,
        spec_version: u32,
    ) -> Result<Arc<RegistryEntry>, RegistryError> {
        let r = self
            .registry
            .read()
            .map_err(|_| RegistryError::Unavailable)?;
        r.entry(network, spec_version)
    }

    fn latest(&self, network: &NetworkId) -> Result<Arc<RegistryEntry>, RegistryError> {
        let r = self
            .registry
            .read()
            .map_err(|_| RegistryError::Unavailable)?;
        r.latest(network)
    }

    fn networks(&self) -> Vec<Arc<RegistryEntry>> {
        match self.registry.read() {
            Ok(r) => r.networks(),
            Err(_) => vec![],
        }
    }
}

impl Driver for Context {
    fn vault(&self) -> &KeyVault {
        &self.vault
    }

    fn store_metadata(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        let mut r = self
            .registry
            .write()
            .map_err(|_| RegistryError::Unavailable)?;

        info!(
            "Storing metadata for {} v{}",
            entry.specs().name,
            entry.spec_version()
        );

        r.insert(entry).map(|_| ())
    }
}

type SessionHandle = Arc<Mutex<Engine<Context>>>;

/// [Navigator] hosts signing sessions for front-ends
pub struct Navigator {
    ctx: Context,
    config: Config,
    sessions: Mutex<BTreeMap<SessionId, SessionHandle>>,
    next: AtomicU64,
}

impl Navigator {
    /// Create a navigator with an empty registry and vault
    pub fn new(config: Config, auth: impl Authenticator + 'static) -> Self {
        Self::with_registry(config, Registry::new(), auth)
    }

    /// Create a navigator with a pre-populated registry
    pub fn with_registry(
        config: Config,
        registry: Registry,
        auth: impl Authenticator + 'static,
    ) -> Self {
        Self {
            ctx: Context {
                registry: Arc::new(RwLock::new(registry)),
                vault: Arc::new(KeyVault::new(auth)),
            },
            config,
            sessions: Mutex::new(BTreeMap::new()),
            next: AtomicU64::new(1),
        }
    }

    /// Fetch navigator configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the shared key vault
    pub fn vault(&self) -> &KeyVault {
        &self.ctx.vault
    }

    /// Fetch the latest metadata for every known network
    pub fn networks(&self) -> Vec<Arc<RegistryEntry>> {
        self.ctx.networks()
    }

    /// Parse, validate and store a metadata blob outside of a session
    pub fn load_metadata(
        &self,
        network: NetworkId,
        raw: &[u8],
    ) -> Result<Arc<RegistryEntry>, Error> {
        let entry = RegistryEntry::load(network, raw)?;

        let mut r = self.ctx.registry.write().map_err(|_| Error::Unavailable)?;
        let e = r.insert(entry)?;

        info!(
            "Loaded metadata for {} v{} ({})",
            e.specs().name,
            e.spec_version(),
            network
        );

        Ok(e)
    }

    /// Open a new session
    pub fn open_session(&self) -> Result<SessionId, Error> {
        let id = SessionId(self.next.fetch_add(1, Ordering::Relaxed));
        let engine = Engine::new(self.ctx.clone(), self.config.engine());

        let mut s = self.sessions.lock().map_err(|_| Error::Unavailable)?;
        s.insert(id, Arc::new(Mutex::new(engine)));

        debug!("Opened session {}", id);

        Ok(id)
    }

    /// Close a session, discarding any state
    pub fn close_session(&self, id: SessionId) -> Result<(), Error> {
        let mut s = self.sessions.lock().map_err(|_| Error::Unavailable)?;
        s.remove(&id).ok_or(Error::UnknownSession(id))?;

        debug!("Closed session {}", id);

        Ok(())
    }

    /// List open sessions
    pub fn sessions(&self) -> Result<Vec<SessionId>, Error> {
        let s = self.sessions.lock().map_err(|_| Error::Unavailable)?;
        Ok(s.keys().copied().collect())
    }

    /// Apply an action to a session, returning the updated view
    pub fn apply_action(&self, id: SessionId, action: &Action) -> Result<SessionView, Error> {
        let h = self.session(id)?;
        let mut e = h.lock().map_err(|_| Error::Unavailable)?;

        debug!("Session {}: {} in {}", id, action.kind(), e.state());

        e.update(action)?;

        Ok(e.view())
    }

    /// Fetch the current view of a session
    pub fn view(&self, id: SessionId) -> Result<SessionView, Error> {
        let h = self.session(id)?;
        let e = h.lock().map_err(|_| Error::Unavailable)?;
        Ok(e.view())
    }

    /// Suggest phrase words for a session entering a recovery phrase
    pub fn guess_words(&self, id: SessionId, prefix: &str) -> Result<Vec<&'static str>, Error> {
        let h = self.session(id)?;
        let e = h.lock().map_err(|_| Error::Unavailable)?;
        Ok(e.guess_words(prefix)?)
    }

    /// Export an address for a network in the `substrate:<ss58>:0x<genesis>` form
    pub fn export_address(&self, key: &MultiSigner, network: &NetworkId) -> Result<String, Error> {
        let entry = self.ctx.latest(network)?;
        Ok(self.ctx.vault.export_address(key, network, entry.specs())?)
    }

    // Fetch a session handle, releasing the session table before use
    fn session(&self, id: SessionId) -> Result<SessionHandle, Error> {
        let s = self.sessions.lock().map_err(|_| Error::Unavailable)?;
        s.get(&id).cloned().ok_or(Error::UnknownSession(id))
    }
}
