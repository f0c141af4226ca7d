// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Derivation path parsing
//!
//! Paths are a sequence of junctions, `//name` for hard and `/name` for soft
//! derivation, optionally followed by `///password`. Numeric junction codes
//! are encoded as little-endian `u64`s, anything else as a SCALE string, with
//! codes longer than 32 bytes replaced by their BLAKE2b-256 hash.

use lazy_static::lazy_static;
use regex::Regex;
use zeroize::Zeroizing;

use airgap_proto::compact::encode_compact;

use super::VaultError;
use crate::helpers::blake2_256;

lazy_static! {
    static ref REG_PATH: Option<Regex> =
        Regex::new(r"^(?P<path>(//?[^/]+)*)(///(?P<password>.+))?$").ok();
    static ref REG_JUNCTION: Option<Regex> = Regex::new(r"/(/?[^/]+)").ok();
}

/// Derivation junction with its 32-byte chain code
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Junction {
    Soft([u8; 32]),
    Hard([u8; 32]),
}

impl Junction {
    /// Parse a junction, a leading `/` marks hard derivation
    pub fn parse(j: &str) -> Self {
        match j.strip_prefix('/') {
            Some(code) => Junction::Hard(chain_code(code)),
            None => Junction::Soft(chain_code(j)),
        }
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        match self {
            Junction::Soft(c) | Junction::Hard(c) => c,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Junction::Hard(_))
    }
}

fn chain_code(code: &str) -> [u8; 32] {
    let mut enc = Vec::with_capacity(code.len() + 5);
    match code.parse::<u64>() {
        Ok(n) => enc.extend_from_slice(&n.to_le_bytes()),
        Err(_) => {
            encode_compact(code.len() as u128, &mut enc);
            enc.extend_from_slice(code.as_bytes());
        }
    }

    if enc.len() > 32 {
        return blake2_256(&enc);
    }

    let mut cc = [0u8; 32];
    cc[..enc.len()].copy_from_slice(&enc);
    cc
}

/// Parsed derivation path
#[derive(Clone, PartialEq)]
pub struct DerivationPath {
    /// Path with any password removed
    path: String,
    junctions: Vec<Junction>,
    password: Option<Zeroizing<String>>,
}

impl DerivationPath {
    /// Parse a derivation path, eg. `//polkadot//0/soft///password`
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let caps = REG_PATH
            .as_ref()
            .and_then(|r| r.captures(s))
            .ok_or(VaultError::InvalidPath)?;
        let path = caps.name("path").map(|m| m.as_str()).unwrap_or("");

        let junctions = match REG_JUNCTION.as_ref() {
            Some(r) => r
                .captures_iter(path)
                .filter_map(|c| c.get(1))
                .map(|m| Junction::parse(m.as_str()))
                .collect(),
            None => return Err(VaultError::InvalidPath),
        };

        Ok(Self {
            path: path.to_string(),
            junctions,
            password: caps
                .name("password")
                .map(|m| Zeroizing::new(m.as_str().to_string())),
        })
    }

    /// Attach a password to a password-less path
    pub fn with_password(mut self, password: Option<&str>) -> Self {
        if let Some(p) = password {
            self.password = Some(Zeroizing::new(p.to_string()));
        }
        self
    }

    /// Path string without password
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl core::fmt::Debug for DerivationPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DerivationPath")
            .field("path", &self.path)
            .field("has_password", &self.has_password())
            .finish()
    }
}

/// Check a derivation path is well-formed, returning whether it carries a password
pub fn check_derivation_format(path: &str) -> Result<bool, VaultError> {
    DerivationPath::parse(path).map(|p| p.has_password())
}

// Strip leading zeroes from numeric codes
fn sanitize_number(code: &str) -> String {
    match code.parse::<u32>() {
        Ok(n) => n.to_string(),
        Err(_) => code.to_string(),
    }
}

/// Suggest a display name for a path, eg. `//polkadot//1/a` becomes `polkadot 1 (a)`
pub fn suggest_path_name(path: &str) -> String {
    let mut out = String::new();

    let path = match DerivationPath::parse(path) {
        Ok(p) => p.path,
        Err(_) => return out,
    };

    for hard in path.split("//").filter(|s| !s.is_empty()) {
        let mut soft = hard.split('/');
        if let Some(first) = soft.next() {
            out.push_str(&sanitize_number(first));

            let mut brackets = 0;
            for s in soft {
                brackets += 1;
                out.push_str(" (");
                out.push_str(&sanitize_number(s));
            }
            match brackets {
                0 => out.push(' '),
                n => out.push_str(&") ".repeat(n)),
            }
        }
    }

    out.trim().to_string()
}

/// Suggest the next free `//N` child of a path, given the paths already in use
pub fn suggest_n_plus_one<'a>(path: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let mut next = 0;

    for e in existing {
        let index = e
            .strip_prefix(path)
            .and_then(|s| s.strip_prefix("//"))
            .and_then(|s| s.parse::<u32>().ok());

        if let Some(i) = index {
            next = next.max(i.saturating_add(1));
        }
    }

    format!("{path}//{next}")
}
