// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] drives a signing session.
//!
//! Front-ends submit [Action]s and render the resulting [SessionView]. All
//! navigation logic lives here, so several front-ends driving one session
//! always agree on what is shown. Actions not valid for the current [State]
//! are rejected with [Error::IllegalAction] and leave the session untouched.
//! Every accepted action is folded into a rolling session [Digest] that
//! front-ends may compare to detect divergence.
//!
//! ```text
//!  Idle -> AwaitingScan -> Decoding -> ReviewingTransaction -> AwaitingAuthentication -> Signed
//!              |               |                |                      |
//!              +---------------+--> Error       +--> Idle (metadata)   +--> (retry)
//! ```

use airgap_proto::{
    qr::{self, FrameCollector, DEFAULT_FRAME_CAPACITY},
    prelude::SignatureResponse,
    state::{Digest, StateTag},
};
use bip39::{Language, Mnemonic};
use encdec::Encode;
use strum::{Display, EnumIter};

use crate::{
    decode::{decode_request, DecodeFailure, DecodeReason, DecoderLimits, Request, Review},
    registry::{MetadataSource, RegistryEntry, RegistryError},
    vault::{self, AuthProof, KeyVault, SeedHandle, Signature, VaultError},
};

mod action;
pub use action::{Action, ActionKind, Secret};

mod error;
pub use error::{Error, SessionError};

mod view;
pub use view::{InputKind, SessionView};

/// Offset of the public key within a signing request
const SIGNER_OFFSET: usize = 3;

/// Seed management flow
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumIter)]
pub enum SeedFlow {
    /// Seed from a newly generated phrase
    #[default]
    New,
    /// Seed from an existing phrase
    Recover,
}

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum State {
    /// Idle, no flow running
    Idle,
    /// Collecting QR frames
    AwaitingScan,
    /// Payload received, ready to decode
    Decoding,
    /// Decoded request pending user approval
    ReviewingTransaction,
    /// Approved, pending authentication
    AwaitingAuthentication,
    /// Signature available
    Signed,
    /// Session failed, see [SessionView::error]
    Error,
    /// Naming a new or recovered seed
    SeedNaming(SeedFlow),
    /// Entering a recovery phrase
    SeedPhraseEntry,
    /// Confirming a new or recovered seed
    ReviewingSeedFlow(SeedFlow),
    /// Seed export pending authentication
    AwaitingExportAuth,
}

impl State {
    /// Fetch the wire tag for this state
    pub fn tag(&self) -> StateTag {
        match self {
            State::Idle => StateTag::Idle,
            State::AwaitingScan => StateTag::AwaitingScan,
            State::Decoding => StateTag::Decoding,
            State::ReviewingTransaction => StateTag::ReviewingTransaction,
            State::AwaitingAuthentication => StateTag::AwaitingAuthentication,
            State::Signed => StateTag::Signed,
            State::Error => StateTag::Error,
            State::SeedNaming(_) => StateTag::SeedNaming,
            State::SeedPhraseEntry => StateTag::SeedPhraseEntry,
            State::ReviewingSeedFlow(_) => StateTag::ReviewingSeedFlow,
            State::AwaitingExportAuth => StateTag::AwaitingExportAuth,
        }
    }

    /// Check whether an action is legal in this state
    pub fn accepts(&self, action: ActionKind) -> bool {
        use ActionKind as A;

        matches!(
            (self, action),
            (
                State::Idle,
                A::StartScan | A::NewSeed | A::RecoverSeed | A::ExportSeed | A::DeleteSeed
            ) | (State::AwaitingScan, A::ScanFrame | A::Cancel)
                | (State::Decoding, A::Decode | A::Cancel)
                | (State::ReviewingTransaction, A::Approve | A::Reject)
                | (State::AwaitingAuthentication, A::Authenticate | A::Cancel)
                | (State::Signed | State::Error, A::Reset)
                | (State::SeedNaming(_), A::SetSeedName | A::Cancel)
                | (State::SeedPhraseEntry, A::SetSeedPhrase | A::Cancel)
                | (State::ReviewingSeedFlow(_), A::ConfirmSeed | A::Cancel)
                | (State::AwaitingExportAuth, A::Authenticate | A::Cancel)
        )
    }
}

/// Engine configuration
#[derive(Clone, PartialEq, Debug)]
pub struct EngineConfig {
    /// Maximum bytes per output QR frame
    pub frame_capacity: usize,
    pub limits: DecoderLimits,
    /// Paths created for each network when a seed is added,
    /// `{network}` is replaced by the network name
    pub default_derivations: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            limits: DecoderLimits::default(),
            default_derivations: vec![String::new(), "//{network}".to_string()],
        }
    }
}

/// [`Driver`] trait provides shared resources for [`Engine`] instances
pub trait Driver: MetadataSource {
    /// Fetch the key vault
    fn vault(&self) -> &KeyVault;

    /// Store an approved metadata update
    fn store_metadata(&self, entry: RegistryEntry) -> Result<(), RegistryError>;
}

impl<T: Driver + ?Sized> Driver for &T {
    fn vault(&self) -> &KeyVault {
        T::vault(self)
    }

    fn store_metadata(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        T::store_metadata(self, entry)
    }
}

/// Seed pending creation
#[derive(Default)]
struct SeedDraft {
    name: Option<String>,
    phrase: Option<Secret>,
}

/// [Engine] drives a single signing or seed management session
pub struct Engine<DRV: Driver> {
    state: State,
    digest: Digest,
    config: EngineConfig,

    collector: FrameCollector,
    payload: Option<Vec<u8>>,
    review: Option<Review>,
    signature: Option<Signature>,
    frames: Vec<Vec<u8>>,

    draft: SeedDraft,
    export: Option<SeedHandle>,

    error: Option<SessionError>,
    secret: Option<Secret>,
    attempts: u32,

    drv: DRV,
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new engine instance with the provided driver and configuration
    pub fn new(drv: DRV, config: EngineConfig) -> Self {
        Self {
            state: State::Idle,
            digest: Digest::new(),
            config,
            collector: FrameCollector::new(),
            payload: None,
            review: None,
            signature: None,
            frames: vec![],
            draft: SeedDraft::default(),
            export: None,
            error: None,
            secret: None,
            attempts: 0,
            drv,
        }
    }

    /// Fetch the current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch the session digest
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Fetch the decoded request under review
    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    /// Fetch the signature once signed
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Handle an incoming action
    pub fn update(&mut self, action: &Action) -> Result<State, Error> {
        let kind = action.kind();

        #[cfg(feature = "log")]
        log::debug!("action {} in state {}", kind, self.state);

        if !self.state.accepts(kind) {
            #[cfg(feature = "log")]
            log::error!("Unexpected action in state {}: {}", self.state, kind);

            return Err(Error::IllegalAction {
                state: self.state.tag(),
                action: kind,
            });
        }

        // Transient view data only lasts until the next accepted action
        let error = self.error.take();
        let secret = self.secret.take();

        if let Err(e) = self.apply(action) {
            self.error = error;
            self.secret = secret;
            return Err(e);
        }

        // Update session digest (only applied for accepted actions)
        self.digest.update(&action.hash());

        Ok(self.state)
    }

    /// Build a view of the current session
    pub fn view(&self) -> SessionView {
        let awaiting_input = match self.state {
            State::AwaitingScan => Some(InputKind::Frames),
            State::ReviewingTransaction => Some(InputKind::Approval),
            State::AwaitingAuthentication if self.needs_password() => Some(InputKind::Password),
            State::AwaitingAuthentication | State::AwaitingExportAuth => {
                Some(InputKind::Authentication)
            }
            State::SeedNaming(_) => Some(InputKind::SeedName),
            State::SeedPhraseEntry => Some(InputKind::SeedPhrase),
            State::ReviewingSeedFlow(_) => Some(InputKind::Confirmation),
            _ => None,
        };

        // New seed phrases are displayed for confirmation
        let secret = match (self.state, &self.draft.phrase) {
            (State::ReviewingSeedFlow(SeedFlow::New), Some(p)) => Some(p.clone()),
            _ => self.secret.clone(),
        };

        SessionView {
            state: self.state.tag(),
            digest: self.digest.clone(),
            cards: self.review.as_ref().map(|r| r.cards.clone()),
            error: self.error.clone(),
            awaiting_input,
            progress: self.collector.progress(),
            frames: self.frames.clone(),
            secret,
            attempts: self.attempts,
        }
    }

    /// Suggest phrase words for a partially entered word while recovering a seed
    pub fn guess_words(&self, prefix: &str) -> Result<Vec<&'static str>, Error> {
        match self.state {
            State::SeedPhraseEntry => Ok(vault::guess(prefix)),
            _ => Err(Error::InvalidState),
        }
    }

    fn needs_password(&self) -> bool {
        match self.review.as_ref().map(|r| &r.request) {
            Some(Request::Sign { signer, network, .. }) => matches!(
                self.drv.vault().lookup_on(signer, network),
                Ok(Some(d)) if d.has_pwd
            ),
            _ => false,
        }
    }

    /// Clear session data, returning to idle
    fn reset(&mut self) {
        self.state = State::Idle;
        self.collector.clear();
        self.payload = None;
        self.review = None;
        self.signature = None;
        self.frames.clear();
        self.draft = SeedDraft::default();
        self.export = None;
        self.attempts = 0;
    }

    /// Route a fatal error to the error state
    fn fail(&mut self, e: SessionError) {
        #[cfg(feature = "log")]
        log::warn!("session failed: {}", e);

        self.error = Some(e);
        self.state = State::Error;
    }

    /// Record a retryable authentication failure
    fn retry(&mut self, e: VaultError) {
        #[cfg(feature = "log")]
        log::debug!("authentication failed: {}", e);

        self.attempts = self.attempts.saturating_add(1);
        self.error = Some(SessionError::Vault(e));
    }

    // Apply a legal action, returning an error only before the session is modified
    fn apply(&mut self, action: &Action) -> Result<(), Error> {
        match (self.state, action) {
            (State::Idle, Action::StartScan) => {
                self.reset();
                self.state = State::AwaitingScan;
            }

            (State::AwaitingScan, Action::ScanFrame(f)) => self.scan_frame(f),

            (State::Decoding, Action::Decode) => return self.decode(),

            (State::ReviewingTransaction, Action::Approve) => return self.approve(),

            (State::AwaitingAuthentication, Action::Authenticate { proof, password }) => {
                return self.sign(proof, password.as_ref().map(|p| p.as_str()))
            }

            (State::AwaitingExportAuth, Action::Authenticate { proof, .. }) => {
                let seed = self.export.ok_or(Error::InvalidState)?;

                match self.drv.vault().export_phrase(seed, proof) {
                    Ok(p) => {
                        self.reset();
                        self.secret = Some(p.into());
                    }
                    Err(VaultError::Unavailable) => return Err(VaultError::Unavailable.into()),
                    Err(e) if e.is_retryable() => self.retry(e),
                    Err(e) => self.fail(SessionError::Vault(e)),
                }
            }

            (State::Idle, Action::NewSeed { words }) => {
                match KeyVault::generate_phrase(*words) {
                    Ok(p) => {
                        self.reset();
                        self.draft.phrase = Some(p.into());
                        self.state = State::SeedNaming(SeedFlow::New);
                    }
                    Err(e) => self.error = Some(SessionError::Vault(e)),
                }
            }

            (State::Idle, Action::RecoverSeed) => {
                self.reset();
                self.state = State::SeedNaming(SeedFlow::Recover);
            }

            (State::SeedNaming(flow), Action::SetSeedName(name)) => {
                let name = name.trim();

                let r = match self.drv.vault().seed_by_name(name) {
                    _ if name.is_empty() => Err(VaultError::InvalidName),
                    Ok(_) => Err(VaultError::DuplicateName(name.to_string())),
                    Err(VaultError::UnknownSeed) => Ok(()),
                    Err(e) => return Err(e.into()),
                };

                match r {
                    Ok(()) => {
                        self.draft.name = Some(name.to_string());
                        self.state = match flow {
                            SeedFlow::New => State::ReviewingSeedFlow(SeedFlow::New),
                            SeedFlow::Recover => State::SeedPhraseEntry,
                        };
                    }
                    Err(e) => self.error = Some(SessionError::Vault(e)),
                }
            }

            (State::SeedPhraseEntry, Action::SetSeedPhrase(phrase)) => {
                match Mnemonic::validate(phrase.as_str().trim(), Language::English) {
                    Ok(()) => {
                        self.draft.phrase = Some(phrase.clone());
                        self.state = State::ReviewingSeedFlow(SeedFlow::Recover);
                    }
                    Err(_) => self.error = Some(SessionError::Vault(VaultError::InvalidPhrase)),
                }
            }

            (State::ReviewingSeedFlow(_), Action::ConfirmSeed) => return self.confirm_seed(),

            (State::Idle, Action::ExportSeed(name)) => match self.drv.vault().seed_by_name(name) {
                Ok(h) => {
                    self.reset();
                    self.export = Some(h);
                    self.state = State::AwaitingExportAuth;
                }
                Err(VaultError::Unavailable) => return Err(VaultError::Unavailable.into()),
                Err(e) => self.error = Some(SessionError::Vault(e)),
            },

            (State::Idle, Action::DeleteSeed { name, proof }) => {
                let vault = self.drv.vault();

                let r = vault
                    .authenticate(proof)
                    .and_then(|_| vault.seed_by_name(name))
                    .and_then(|h| vault.delete(h));

                match r {
                    Ok(()) => self.reset(),
                    Err(VaultError::Unavailable) => return Err(VaultError::Unavailable.into()),
                    Err(e) => self.error = Some(SessionError::Vault(e)),
                }
            }

            (State::ReviewingTransaction, Action::Reject)
            | (State::Signed | State::Error, Action::Reset)
            | (_, Action::Cancel) => self.reset(),

            // Unhandled actions are filtered by `State::accepts`
            (_s, _a) => {
                #[cfg(feature = "log")]
                log::error!("Unexpected action in state {}: {:?}", _s, _a.kind());

                return Err(Error::IllegalAction {
                    state: self.state.tag(),
                    action: action.kind(),
                });
            }
        }

        Ok(())
    }

    fn scan_frame(&mut self, frame: &[u8]) {
        let p = match self.collector.push(frame) {
            Ok(p) => p,
            Err(e) => return self.fail(SessionError::Transport(e)),
        };

        #[cfg(feature = "log")]
        log::debug!("scan progress {}/{}", p.received, p.total);

        if !p.is_complete() {
            return;
        }

        match self.collector.finish() {
            Ok(payload) => {
                self.payload = Some(payload);
                self.state = State::Decoding;
            }
            Err(e) => self.fail(SessionError::Transport(e)),
        }
    }

    fn decode(&mut self) -> Result<(), Error> {
        let payload = self.payload.as_ref().ok_or(Error::InvalidState)?;

        let review = match decode_request(payload, &self.drv, &self.config.limits) {
            Ok(r) => r,
            Err(f) => {
                self.fail(SessionError::Decode(f));
                return Ok(());
            }
        };

        // Signing requests must be for a known address enabled on the network
        if let Request::Sign {
            signer, network, ..
        } = &review.request
        {
            if self.drv.vault().lookup_on(signer, network)?.is_none() {
                self.fail(SessionError::Decode(DecodeFailure::new(
                    DecodeReason::UnknownSigner,
                    SIGNER_OFFSET,
                )));
                return Ok(());
            }
        }

        self.review = Some(review);
        self.state = State::ReviewingTransaction;

        Ok(())
    }

    fn approve(&mut self) -> Result<(), Error> {
        let review = self.review.as_ref().ok_or(Error::InvalidState)?;

        match &review.request {
            Request::Sign { .. } => self.state = State::AwaitingAuthentication,
            Request::LoadMetadata(entry) => {
                match self.drv.store_metadata(entry.as_ref().clone()) {
                    Ok(()) => self.reset(),
                    Err(RegistryError::Unavailable) => {
                        return Err(RegistryError::Unavailable.into())
                    }
                    Err(e) => self.fail(SessionError::Registry(e)),
                }
            }
        }

        Ok(())
    }

    fn sign(&mut self, proof: &AuthProof, password: Option<&str>) -> Result<(), Error> {
        let (signer, network, payload) = match self.review.as_ref().map(|r| &r.request) {
            Some(Request::Sign {
                signer,
                network,
                payload,
                ..
            }) => (*signer, *network, payload),
            _ => return Err(Error::InvalidState),
        };

        let vault = self.drv.vault();

        // Address may have been removed since decoding
        let key = match vault.lookup_on(&signer, &network)? {
            Some(d) => d.key(signer),
            None => {
                self.fail(SessionError::Vault(VaultError::UnknownAddress));
                return Ok(());
            }
        };

        let signature = match vault.sign(&key, password, proof, payload) {
            Ok(s) => s,
            Err(VaultError::Unavailable) => return Err(VaultError::Unavailable.into()),
            Err(e) if e.is_retryable() => {
                self.retry(e);
                return Ok(());
            }
            Err(e) => {
                self.fail(SessionError::Vault(e));
                return Ok(());
            }
        };

        // Encode response for display
        let r = SignatureResponse {
            encryption: signature.encryption(),
            signature: signature.as_bytes(),
        };
        let mut buff = vec![0u8; 1 + signature.as_bytes().len()];
        let frames = r
            .encode(&mut buff)
            .and_then(|n| qr::encode(&buff[..n], self.config.frame_capacity));

        match frames {
            Ok(f) => {
                self.frames = f;
                self.signature = Some(signature);
                self.state = State::Signed;
            }
            Err(e) => self.fail(SessionError::Transport(e)),
        }

        Ok(())
    }

    fn confirm_seed(&mut self) -> Result<(), Error> {
        let (name, phrase) = match (&self.draft.name, &self.draft.phrase) {
            (Some(n), Some(p)) => (n, p),
            _ => return Err(Error::InvalidState),
        };

        let vault = self.drv.vault();

        let seed = match vault.import_phrase(name, phrase.as_str()) {
            Ok(h) => h,
            Err(VaultError::Unavailable) => return Err(VaultError::Unavailable.into()),
            Err(e) => {
                self.fail(SessionError::Vault(e));
                return Ok(());
            }
        };

        let networks = self.drv.networks();
        if let Err(e) = vault.populate_defaults(seed, &networks, &self.config.default_derivations)
        {
            // Seed duplicates an existing one, roll back
            if let Err(_e) = vault.delete(seed) {
                #[cfg(feature = "log")]
                log::error!("failed to roll back seed '{}': {}", name, _e);
            }
            self.fail(SessionError::Vault(e));
            return Ok(());
        }

        #[cfg(feature = "log")]
        log::info!("added seed '{}'", name);

        self.reset();

        Ok(())
    }

    /// Force the engine into a state, for state matrix tests
    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }
}
