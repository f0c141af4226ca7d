// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signer configuration, loaded from TOML with every field defaulted

use std::path::Path;

use log::{debug, LevelFilter};
use serde::{Deserialize, Serialize};

use airgap_core::{decode::DecoderLimits, engine::EngineConfig};
use airgap_proto::qr::DEFAULT_FRAME_CAPACITY;

use crate::Error;

/// Signer configuration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LevelFilter,
    pub qr: QrConfig,
    pub decoder: DecoderConfig,
    pub vault: VaultConfig,
}

/// QR transport configuration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Maximum bytes per output frame
    pub frame_capacity: usize,
}

/// Decoder limits
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum type nesting depth
    pub max_depth: u32,
    /// Maximum element count for sequences of zero-sized elements
    pub max_sequence_len: u64,
}

/// Key vault configuration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Paths derived for every known network when a seed is added,
    /// `{network}` is replaced with the lower-case network name
    pub default_derivations: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            qr: QrConfig::default(),
            decoder: DecoderConfig::default(),
            vault: VaultConfig::default(),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        let l = DecoderLimits::default();
        Self {
            max_depth: l.max_depth,
            max_sequence_len: l.max_sequence_len,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_derivations: EngineConfig::default().default_derivations,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, Error> {
        let c = toml::from_str(s)?;
        Ok(c)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        debug!("Loading configuration from '{}'", path.as_ref().display());

        let s = std::fs::read_to_string(path)?;
        Self::parse(&s)
    }

    /// Build engine configuration for new sessions
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            frame_capacity: self.qr.frame_capacity,
            limits: DecoderLimits {
                max_depth: self.decoder.max_depth,
                max_sequence_len: self.decoder.max_sequence_len,
            },
            default_derivations: self.vault.default_derivations.clone(),
        }
    }
}
