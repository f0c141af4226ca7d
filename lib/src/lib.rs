// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Air-gapped signer host library (and CLI)
//!
//! The [Navigator] hosts signing sessions for one or more front-ends, each
//! session an independent [Engine][airgap_core::engine::Engine] sharing only
//! the metadata registry and key vault.
//!

/// Re-export `airgap-core` for consumers
pub use airgap_core::{self as engine_core};

/// Re-export `airgap-proto` for consumers
pub use airgap_proto::{self as proto};

mod config;
pub use config::{Config, DecoderConfig, QrConfig, VaultConfig};

mod error;
pub use error::Error;

mod navigator;
pub use navigator::{Navigator, SessionId};
