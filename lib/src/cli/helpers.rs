// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::Path;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use log::debug;
use serde::Serialize;

/// Fixed length hex argument
#[derive(Clone, PartialEq, Debug)]
pub struct HexData<const N: usize = 32>(pub [u8; N]);

impl<const N: usize> std::str::FromStr for HexData<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; N];

        hex::decode_to_slice(s.trim_start_matches("0x"), &mut b)?;

        Ok(HexData(b))
    }
}

impl<const N: usize> AsRef<[u8; N]> for HexData<N> {
    fn as_ref(&self) -> &[u8; N] {
        &self.0
    }
}

/// Variable length binary argument, hex (with optional `0x` prefix)
/// or base64 with a `b64:` prefix
#[derive(Clone, PartialEq, Debug)]
pub struct Bytes(pub Vec<u8>);

impl std::str::FromStr for Bytes {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b = match s.strip_prefix("b64:") {
            Some(b) => BASE64_STANDARD.decode(b)?,
            None => hex::decode(s.trim_start_matches("0x"))?,
        };

        Ok(Bytes(b))
    }
}

/// Read a binary input file, hex-encoded for `.hex` files
pub fn read_input(file_name: &Path) -> anyhow::Result<Vec<u8>> {
    debug!("Reading input from '{}'", file_name.display());

    let b = std::fs::read(file_name)?;

    let v = match file_name.extension().and_then(|e| e.to_str()) {
        Some("hex") => hex::decode(String::from_utf8(b)?.trim().trim_start_matches("0x"))?,
        _ => b,
    };

    Ok(v)
}

/// Write an output file if the `--output` argument is provided,
/// otherwise print to stdout
pub fn write_output(file_name: Option<&Path>, value: &impl Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;

    let p = match file_name {
        Some(p) => p,
        None => {
            println!("{s}");
            return Ok(());
        }
    };

    debug!("Writing output to '{}'", p.display());

    // Determine format from file name
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => std::fs::write(p, s)?,
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
