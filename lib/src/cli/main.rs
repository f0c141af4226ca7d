// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for the air-gapped signer
//!
//! Decodes signing requests against metadata files, splits and reassembles
//! QR frame payloads, and derives and signs with development keys.

use std::path::PathBuf;

use bip39::{Language, Mnemonic};
use clap::Parser;
use log::{debug, info, LevelFilter};
use serde::Serialize;
use zeroize::Zeroizing;

use airgap_core::{
    decode::{decode_request, CardTree, Request, SignKind},
    registry::{NetworkId, Registry},
    signer,
    vault::{DerivationPath, KeyPair},
};
use airgap_proto::{
    prelude::SignatureResponse,
    qr,
    Encryption,
};
use airgap_signer::Config;
use encdec::Encode;

mod helpers;
use helpers::*;

/// Air-gapped signer command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Configuration file (TOML)
    #[clap(long, env = "AIRGAP_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Log level, overrides configuration
    #[clap(long)]
    log_level: Option<LevelFilter>,
}

/// Metadata arguments for request decoding
#[derive(Clone, PartialEq, Debug, Parser)]
struct MetadataArgs {
    /// Network genesis hash
    #[clap(long)]
    network: HexData<32>,

    /// Metadata blob files for the network
    #[clap(long = "metadata", required = true)]
    metadata: Vec<PathBuf>,
}

/// Request payload, as an argument or input file
#[derive(Clone, PartialEq, Debug, Parser)]
struct PayloadArgs {
    /// Hex or base64 (`b64:` prefixed) encoded request
    #[clap(conflicts_with = "input", required_unless_present = "input")]
    payload: Option<Bytes>,

    /// Request file (binary, or hex for `.hex` files)
    #[clap(long)]
    input: Option<PathBuf>,
}

impl PayloadArgs {
    fn load(&self) -> anyhow::Result<Vec<u8>> {
        match (&self.payload, &self.input) {
            (Some(p), _) => Ok(p.0.clone()),
            (None, Some(f)) => read_input(f),
            (None, None) => Err(anyhow::anyhow!("no payload provided")),
        }
    }
}

/// Key derivation arguments
#[derive(Clone, PartialEq, Debug, Parser)]
struct KeyArgs {
    /// BIP-39 seed phrase
    #[clap(long, env = "AIRGAP_PHRASE", hide_env_values = true)]
    phrase: String,

    /// Derivation path, eg. `//westend//0///password`
    #[clap(long, default_value = "")]
    path: String,
}

impl KeyArgs {
    fn derive(&self, encryption: Encryption) -> anyhow::Result<KeyPair> {
        let m = Mnemonic::from_phrase(self.phrase.trim(), Language::English)?;
        let entropy = Zeroizing::new(m.entropy().to_vec());

        let p = DerivationPath::parse(&self.path)?;
        let k = KeyPair::derive(&entropy, &p, encryption)?;

        Ok(k)
    }
}

/// Signature schemes
#[derive(Copy, Clone, PartialEq, Debug, clap::ValueEnum)]
enum Scheme {
    Sr25519,
    Ed25519,
    Ecdsa,
}

impl From<Scheme> for Encryption {
    fn from(s: Scheme) -> Self {
        match s {
            Scheme::Sr25519 => Encryption::Sr25519,
            Scheme::Ed25519 => Encryption::Ed25519,
            Scheme::Ecdsa => Encryption::Ecdsa,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Decode a signing request, printing cards as JSON
    Decode {
        #[clap(flatten)]
        metadata: MetadataArgs,

        #[clap(flatten)]
        payload: PayloadArgs,

        /// Output file (`.json`), defaults to stdout
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Split a payload into QR frames
    QrEncode {
        #[clap(flatten)]
        payload: PayloadArgs,

        /// Maximum bytes per frame, overrides configuration
        #[clap(long)]
        capacity: Option<usize>,
    },

    /// Reassemble a payload from QR frames (in any order)
    QrDecode {
        /// Hex encoded frames
        #[clap(required = true)]
        frames: Vec<Bytes>,
    },

    /// Derive a public key and address
    Derive {
        #[clap(flatten)]
        key: KeyArgs,

        /// Signature scheme
        #[clap(long, value_enum, default_value = "sr25519")]
        scheme: Scheme,

        /// SS58 address prefix
        #[clap(long, default_value = "42")]
        prefix: u16,
    },

    /// Decode and sign a request, printing signature response frames
    Sign {
        #[clap(flatten)]
        key: KeyArgs,

        #[clap(flatten)]
        metadata: MetadataArgs,

        #[clap(flatten)]
        payload: PayloadArgs,
    },
}

/// Decoded request output
#[derive(Clone, Debug, Serialize)]
struct Decoded<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sign_kind: Option<SignKind>,
    cards: &'a CardTree,
}

/// Derived key output
#[derive(Clone, Debug, Serialize)]
struct Derived {
    scheme: String,
    public: String,
    address: String,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Load configuration
    let config = match &args.config {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };

    // Setup logging
    let level = args.log_level.unwrap_or(config.log_level);
    simplelog::SimpleLogger::init(level, simplelog::Config::default())?;

    execute(&config, args.cmd)
}

/// Execute a command with the provided configuration
fn execute(config: &Config, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Decode {
            metadata,
            payload,
            output,
        } => {
            let registry = load_registry(&metadata)?;
            let payload = payload.load()?;

            let review = decode_request(&payload, &registry, &config.engine().limits)
                .map_err(|f| anyhow::anyhow!("decode failed: {f}"))?;

            let (kind, signer, sign_kind) = match &review.request {
                Request::Sign { signer, kind, .. } => {
                    ("sign", Some(signer.to_string()), Some(*kind))
                }
                Request::LoadMetadata(_) => ("load_metadata", None, None),
            };

            let d = Decoded {
                kind,
                signer,
                sign_kind,
                cards: &review.cards,
            };

            write_output(output.as_deref(), &d)?;
        }
        Actions::QrEncode { payload, capacity } => {
            let payload = payload.load()?;
            let capacity = capacity.unwrap_or(config.qr.frame_capacity);

            let frames = qr::encode(&payload, capacity)?;

            info!("{} byte payload in {} frame(s)", payload.len(), frames.len());

            for f in frames {
                println!("{}", hex::encode(f));
            }
        }
        Actions::QrDecode { frames } => {
            let frames: Vec<_> = frames.into_iter().map(|f| f.0).collect();
            let payload = qr::decode(&frames)?;

            println!("{}", hex::encode(payload));
        }
        Actions::Derive {
            key,
            scheme,
            prefix,
        } => {
            let k = key.derive(scheme.into())?;
            let p = k.public();

            let d = Derived {
                scheme: p.encryption().to_string(),
                public: hex::encode(p.as_bytes()),
                address: p.to_ss58(prefix),
            };

            write_output(None, &d)?;
        }
        Actions::Sign {
            key,
            metadata,
            payload,
        } => {
            let registry = load_registry(&metadata)?;
            let payload = payload.load()?;

            let review = decode_request(&payload, &registry, &config.engine().limits)
                .map_err(|f| anyhow::anyhow!("decode failed: {f}"))?;

            let (signer, message) = match &review.request {
                Request::Sign {
                    signer, payload, ..
                } => (signer, payload),
                Request::LoadMetadata(_) => {
                    return Err(anyhow::anyhow!("metadata updates are not signed"))
                }
            };

            let k = key.derive(signer.encryption())?;
            if k.public() != *signer {
                return Err(anyhow::anyhow!(
                    "request signer {} does not match derived key {}",
                    signer,
                    k.public()
                ));
            }

            let s = signer::sign(&k, message)?;

            let r = SignatureResponse {
                encryption: s.encryption(),
                signature: s.as_bytes(),
            };
            let mut buff = vec![0u8; r.encode_len()?];
            r.encode(&mut buff)?;

            info!("signed {} byte payload with {}", message.len(), signer);

            for f in qr::encode(&buff, config.qr.frame_capacity)? {
                println!("{}", hex::encode(f));
            }
        }
    }

    Ok(())
}

/// Load metadata files into a registry
fn load_registry(args: &MetadataArgs) -> anyhow::Result<Registry> {
    let network = NetworkId(args.network.0);
    let mut r = Registry::new();

    for p in &args.metadata {
        let raw = read_input(p)?;
        let e = r.load(network, &raw)?;

        debug!(
            "Loaded {} v{} from '{}'",
            e.specs().name,
            e.spec_version(),
            p.display()
        );
    }

    Ok(r)
}
