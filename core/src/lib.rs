// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Air-gapped signing engine
//!
//! This provides a common [Engine][engine::Engine] for reviewing and signing
//! transactions on a device with no network connection, with all data
//! crossing the air gap as QR codes (see [airgap_proto] for wire encodings).
//!
//! Interactions with the engine are performed via [Action][engine::Action]s,
//! with front-ends rendering the resulting [SessionView][engine::SessionView].
//!
//! ## Components
//!
//! - [registry] holds versioned metadata describing how bytes map to typed values
//!   for each `(network, spec_version)`
//! - [decode] turns a payload and registry entry into a tree of reviewable cards
//! - [vault] owns seeds and derives sr25519 / ed25519 / ecdsa keys along
//!   substrate derivation paths
//! - [signer] produces and verifies signatures for derived keys
//! - [engine] is the session state machine tying these together
//!
//! ## Signing a transaction
//!
//! 1. Issue [`StartScan`][engine::Action::StartScan] then a
//!    [`ScanFrame`][engine::Action::ScanFrame] for each QR frame scanned,
//!    the engine moves to `Decoding` once every frame is received
//! 2. Issue [`Decode`][engine::Action::Decode] to decode the request, the
//!    [SessionView][engine::SessionView] now contains the card tree for review
//! 3. Issue [`Approve`][engine::Action::Approve] or [`Reject`][engine::Action::Reject]
//! 4. Issue [`Authenticate`][engine::Action::Authenticate] with the user's
//!    authentication proof (and derivation password where required), on
//!    success the view contains the signature response frames for display
//!
//! Every accepted action updates a rolling session
//! [`Digest`][airgap_proto::state::Digest], front-ends driving the same
//! session _MUST_ mirror this and compare it to the engine's to detect
//! divergence.

pub use airgap_proto::{self as proto};

pub mod registry;

pub mod decode;

pub mod vault;

pub mod signer;

pub mod engine;

pub mod helpers;
