// Copyright (c) 2022-2023 The MobileCoin Foundation

use airgap_proto::state::StateTag;

use super::ActionKind;
use crate::{decode::DecodeFailure, registry::RegistryError, vault::VaultError};

/// [Engine][super::Engine] errors, returned to the caller with the
/// session left unchanged
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// Action not valid in the current state
    #[error("illegal action {action} in state {state}")]
    IllegalAction { state: StateTag, action: ActionKind },

    /// Session data missing for the current state
    #[error("invalid engine state")]
    InvalidState,

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors surfaced to the user through the [SessionView][super::SessionView]
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(airgap_proto::Error),

    #[error("decode failed: {0}")]
    Decode(DecodeFailure),

    #[error("{0}")]
    Vault(VaultError),

    #[error("metadata rejected: {0}")]
    Registry(RegistryError),
}

impl SessionError {
    /// Byte offset for decode failures
    pub fn offset(&self) -> Option<usize> {
        match self {
            SessionError::Decode(f) => Some(f.offset),
            _ => None,
        }
    }
}
