// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::Display;

use airgap_proto::{qr::Progress, state::{Digest, StateTag}};

use super::{Secret, SessionError};
use crate::decode::CardTree;

/// Input a front-end should collect next
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InputKind {
    /// QR frames
    Frames,
    /// Approve or reject the decoded request
    Approval,
    /// Authentication proof
    Authentication,
    /// Authentication proof and derivation password
    Password,
    SeedName,
    SeedPhrase,
    /// Confirm the pending seed
    Confirmation,
}

/// Session view, everything a front-end renders
#[derive(Clone, PartialEq, Debug)]
pub struct SessionView {
    pub state: StateTag,
    pub digest: Digest,
    /// Decoded request cards while reviewing or signing
    pub cards: Option<CardTree>,
    pub error: Option<SessionError>,
    pub awaiting_input: Option<InputKind>,
    /// Frame reception progress while scanning
    pub progress: Progress,
    /// Signature response frames once signed
    pub frames: Vec<Vec<u8>>,
    /// Phrase to display (new or exported seed)
    pub secret: Option<Secret>,
    /// Failed authentication attempts
    pub attempts: u32,
}
