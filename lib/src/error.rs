// Copyright (c) 2022-2023 The MobileCoin Foundation

use airgap_core::{engine, registry::RegistryError, vault::VaultError};

use crate::SessionId;

/// Air-gapped signer API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No session with this identifier
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),

    /// Action rejected by the session engine
    #[error("Engine operation failed: {0}")]
    Engine(#[from] engine::Error),

    /// Metadata rejected
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Key vault error
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Invalid configuration file
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared state lock poisoned
    #[error("Navigator unavailable")]
    Unavailable,
}
