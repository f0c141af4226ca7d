// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::{Display, EnumDiscriminants, EnumIter};
use zeroize::Zeroizing;

use airgap_proto::digest::{digest_action, digest_new_seed, digest_scan_frame, digest_seed_name};

use crate::vault::AuthProof;

/// Secret user input (phrases, passwords), redacted from debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(s: &str) -> Self {
        Self(Zeroizing::new(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Zeroizing<String>> for Secret {
    fn from(s: Zeroizing<String>) -> Self {
        Self(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Secret(..)")
    }
}

/// [Engine][super::Engine] input actions, submitted by front-ends
#[derive(Clone, PartialEq, Debug, EnumDiscriminants)]
#[strum_discriminants(name(ActionKind), derive(Display, EnumIter, Hash, PartialOrd, Ord))]
pub enum Action {
    /// Start scanning a request
    StartScan,
    /// Add a scanned QR frame
    ScanFrame(Vec<u8>),
    /// Decode the scanned payload
    Decode,
    /// Approve the decoded request
    Approve,
    /// Reject the decoded request
    Reject,
    /// Authenticate signing or export, with the derivation password for
    /// password-protected keys
    Authenticate {
        proof: AuthProof,
        password: Option<Secret>,
    },
    /// Return to idle from a terminal state
    Reset,
    /// Abandon the current flow
    Cancel,
    /// Start creating a seed with a new random phrase
    NewSeed { words: usize },
    /// Start recovering a seed from an existing phrase
    RecoverSeed,
    SetSeedName(String),
    SetSeedPhrase(Secret),
    /// Import the pending seed
    ConfirmSeed,
    /// Start exporting a seed phrase
    ExportSeed(String),
    /// Delete a seed and its addresses
    DeleteSeed { name: String, proof: AuthProof },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        ActionKind::from(self)
    }

    /// Compute the digest contribution of this action, secret inputs
    /// contribute only the fact the action occurred
    pub fn hash(&self) -> [u8; 32] {
        match self {
            Action::StartScan => digest_action("start_scan", &[]),
            Action::ScanFrame(f) => digest_scan_frame(f),
            Action::Decode => digest_action("decode", &[]),
            Action::Approve => digest_action("approve", &[]),
            Action::Reject => digest_action("reject", &[]),
            Action::Authenticate { .. } => digest_action("authenticate", &[]),
            Action::Reset => digest_action("reset", &[]),
            Action::Cancel => digest_action("cancel", &[]),
            Action::NewSeed { words } => digest_new_seed(*words),
            Action::RecoverSeed => digest_action("recover_seed", &[]),
            Action::SetSeedName(n) => digest_seed_name(n),
            Action::SetSeedPhrase(_) => digest_action("seed_phrase", &[]),
            Action::ConfirmSeed => digest_action("confirm_seed", &[]),
            Action::ExportSeed(n) => digest_action("export_seed", n.as_bytes()),
            Action::DeleteSeed { name, .. } => digest_action("delete_seed", name.as_bytes()),
        }
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn secrets_are_not_hashed() {
        let a = Action::SetSeedPhrase(Secret::new("one two"));
        let b = Action::SetSeedPhrase(Secret::new("three four"));
        assert_eq!(a.hash(), b.hash());

        let a = Action::Authenticate {
            proof: AuthProof::new("1234"),
            password: None,
        };
        let b = Action::Authenticate {
            proof: AuthProof::new("0000"),
            password: Some(Secret::new("pwd")),
        };
        assert_eq!(a.hash(), b.hash());
        assert!(!format!("{b:?}").contains("pwd"));

        assert_ne!(
            Action::ScanFrame(vec![1]).hash(),
            Action::ScanFrame(vec![2]).hash()
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(Action::NewSeed { words: 12 }.kind(), ActionKind::NewSeed);
        assert_eq!(ActionKind::iter().count(), 15);
    }
}
