// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Scripted session scenarios

use anyhow::{anyhow, ensure};
use log::{debug, info};

use airgap_core::{
    decode::{covers, CardKind, DecodeReason},
    engine::{Action, InputKind, Secret, SessionError, SessionView},
    registry::{NetworkId, RegistryEntry},
    signer,
    vault::{AuthProof, MultiSigner, Signature},
};
use airgap_proto::{
    compact::encode_compact,
    prelude::{SignatureResponse, PRELUDE_LEN},
    qr,
    state::StateTag,
};
use encdec::Decode;

use crate::{
    metadata::{SPEC_VERSION, SYSTEM},
    request::{self, calls, Extensions},
    Session, ALICE_PHRASE, PIN,
};

/// Frame capacity used when splitting requests, small enough to force
/// multipart transfers
pub const FRAME_CAPACITY: usize = 64;

fn authenticate(password: Option<&str>) -> Action {
    Action::Authenticate {
        proof: AuthProof::new(PIN),
        password: password.map(Secret::new),
    }
}

/// Scan a payload as QR frames, returning the view once complete
pub fn scan<S: Session>(s: &mut S, payload: &[u8]) -> anyhow::Result<SessionView> {
    s.apply(Action::StartScan)?;

    let frames = qr::encode(payload, FRAME_CAPACITY).map_err(|e| anyhow!("{e:?}"))?;
    debug!("scanning {} bytes in {} frames", payload.len(), frames.len());

    let mut v = s.view()?;
    for f in frames {
        v = s.apply(Action::ScanFrame(f))?;
    }

    Ok(v)
}

/// Scan and decode a payload
pub fn scan_decode<S: Session>(s: &mut S, payload: &[u8]) -> anyhow::Result<SessionView> {
    let v = scan(s, payload)?;
    ensure!(v.state == StateTag::Decoding, "scan incomplete: {:?}", v.state);

    s.apply(Action::Decode)
}

/// Decode the signature response frames of a signed session
pub fn signature(v: &SessionView) -> anyhow::Result<Signature> {
    let b = qr::decode(&v.frames).map_err(|e| anyhow!("{e:?}"))?;
    let (r, _) = SignatureResponse::decode(&b).map_err(|e| anyhow!("{e:?}"))?;

    Signature::from_parts(r.encryption, r.signature)
        .ok_or_else(|| anyhow!("invalid signature response"))
}

/// Sign a transfer and verify the resulting signature
pub fn sign_transfer<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let call = calls::transfer(&[0x8e; 32], 1_500_000_000_000);
    let ext = Extensions::new(network).mortal().nonce(7).tip(10_000_000_000);
    let payload = request::transaction(signer, &call, &ext, network);

    let v = scan_decode(s, &payload)?;
    ensure!(
        v.state == StateTag::ReviewingTransaction,
        "decode failed: {:?}",
        v.error
    );

    // Review cards
    let cards = v.cards.ok_or_else(|| anyhow!("missing cards"))?;
    ensure!(covers(&cards, payload.len()), "cards do not cover payload");

    let kinds: Vec<_> = cards.iter().map(|c| c.kind).collect();
    ensure!(
        kinds
            == [
                CardKind::Author,
                CardKind::Pallet,
                CardKind::Era,
                CardKind::Nonce,
                CardKind::Tip,
                CardKind::SpecVersion,
                CardKind::TxVersion,
                CardKind::GenesisHash,
                CardKind::BlockHash,
                CardKind::Network,
            ],
        "unexpected cards: {kinds:?}"
    );

    let mut values = vec![];
    cards[1].walk(&mut |c| values.push(c.value.as_str()));
    info!("call: {values:?}");
    ensure!(values[0] == "Balances" && values[1] == "transfer_keep_alive");
    ensure!(values.contains(&"1.5 WND"), "missing balance: {values:?}");
    ensure!(cards[4].value == "0.01 WND", "tip: {}", cards[4].value);

    // Approve and authenticate
    let v = s.apply(Action::Approve)?;
    ensure!(v.state == StateTag::AwaitingAuthentication);

    let expected = match password {
        Some(_) => InputKind::Password,
        None => InputKind::Authentication,
    };
    ensure!(v.awaiting_input == Some(expected));

    let v = s.apply(authenticate(password))?;
    ensure!(v.state == StateTag::Signed, "signing failed: {:?}", v.error);

    // Signatures cover call and extensions
    let mut signed = call.clone();
    ext.encode(&mut signed);

    let sig = signature(&v)?;
    ensure!(signer::verify(signer, &signed, &sig), "invalid signature");

    s.apply(Action::Reset)?;

    Ok(())
}

/// Sign a message and verify the resulting signature
pub fn sign_message<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
) -> anyhow::Result<()> {
    let msg = b"air gap";
    let v = scan_decode(s, &request::message(signer, msg, network))?;
    ensure!(v.state == StateTag::ReviewingTransaction, "{:?}", v.error);

    s.apply(Action::Approve)?;
    let v = s.apply(authenticate(None))?;
    ensure!(v.state == StateTag::Signed, "{:?}", v.error);

    let sig = signature(&v)?;
    ensure!(signer::verify(signer, b"<Bytes>air gap</Bytes>", &sig));

    s.apply(Action::Reset)?;

    Ok(())
}

/// Requests for a network the signer is not enabled on are rejected at the signer
pub fn network_not_enabled<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
) -> anyhow::Result<()> {
    let v = scan_decode(s, &request::message(signer, b"air gap", network))?;
    ensure!(v.state == StateTag::Error, "accepted signer: {:?}", v.state);

    match v.error {
        Some(SessionError::Decode(f)) => {
            ensure!(f.offset == PRELUDE_LEN, "offset {}", f.offset);
            ensure!(f.reason == DecodeReason::UnknownSigner, "{:?}", f.reason);
        }
        e => return Err(anyhow!("unexpected error: {e:?}")),
    }

    s.apply(Action::Reset)?;

    Ok(())
}

/// Unknown call indices decode as an unknown call with raw arguments
pub fn unknown_call<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
) -> anyhow::Result<()> {
    let call = calls::system(0x07, &[0xde, 0xad, 0xbe, 0xef]);
    let payload = request::transaction(signer, &call, &Extensions::new(network), network);

    let v = scan_decode(s, &payload)?;
    ensure!(v.state == StateTag::ReviewingTransaction, "{:?}", v.error);

    let cards = v.cards.ok_or_else(|| anyhow!("missing cards"))?;
    ensure!(covers(&cards, payload.len()));

    let pallet = &cards[1];
    ensure!(pallet.value == "System");

    let unknown = &pallet.children[0];
    ensure!(unknown.kind == CardKind::UnknownVariant, "{unknown:?}");
    ensure!(unknown.value == "unknown call 7");
    ensure!(unknown.children[0].kind == CardKind::Raw);
    ensure!(unknown.children[0].value == "0xdeadbeef");

    s.apply(Action::Reject)?;

    Ok(())
}

/// Length prefixes overrunning the call fail at the prefix offset
pub fn length_overrun<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
) -> anyhow::Result<()> {
    let mut call = vec![SYSTEM, 0x00];
    encode_compact(1_000_000, &mut call);
    call.extend_from_slice(&[0u8; 10]);

    let payload = request::transaction(signer, &call, &Extensions::new(network), network);
    let prefix_at = request::call_offset(signer, call.len()) + 2;

    let v = scan_decode(s, &payload)?;
    ensure!(v.state == StateTag::Error);

    match v.error {
        Some(SessionError::Decode(f)) => {
            ensure!(f.offset == prefix_at, "offset {} != {}", f.offset, prefix_at);
            ensure!(
                f.reason
                    == DecodeReason::LengthOverrun {
                        claimed: 1_000_000,
                        remaining: 10
                    },
                "{:?}",
                f.reason
            );
        }
        e => return Err(anyhow!("unexpected error: {e:?}")),
    }

    s.apply(Action::Reset)?;

    Ok(())
}

/// Transactions for versions without loaded metadata are rejected
pub fn version_mismatch<S: Session>(
    s: &mut S,
    signer: &MultiSigner,
    network: &NetworkId,
) -> anyhow::Result<()> {
    let call = calls::remark(b"hello");
    let ext = Extensions::new(network).spec_version(SPEC_VERSION + 1);
    let payload = request::transaction(signer, &call, &ext, network);

    // Era, nonce and tip precede the spec version
    let version_at = request::call_offset(signer, call.len()) + call.len() + 3;

    let v = scan_decode(s, &payload)?;
    ensure!(v.state == StateTag::Error);

    match v.error {
        Some(SessionError::Decode(f)) => {
            ensure!(f.offset == version_at, "offset {} != {}", f.offset, version_at);
            ensure!(matches!(
                f.reason,
                DecodeReason::VersionMismatch { requested, .. } if requested == SPEC_VERSION + 1
            ));
        }
        e => return Err(anyhow!("unexpected error: {e:?}")),
    }

    s.apply(Action::Reset)?;

    Ok(())
}

/// Load a metadata update through a session
pub fn load_metadata<S: Session>(s: &mut S, entry: &RegistryEntry) -> anyhow::Result<()> {
    let payload = request::metadata_update(entry);

    let v = scan_decode(s, &payload)?;
    ensure!(v.state == StateTag::ReviewingTransaction, "{:?}", v.error);

    let cards = v.cards.ok_or_else(|| anyhow!("missing cards"))?;
    ensure!(cards[0].kind == CardKind::Network);
    // Prelude and header belong to the network card, the blob follows
    let header_len = PRELUDE_LEN + 32;
    ensure!(
        cards[0].range() == (0..header_len),
        "{:?}",
        cards[0].range()
    );
    ensure!(cards[1].kind == CardKind::Metadata);
    ensure!(cards[1].range() == (header_len..payload.len()));
    ensure!(covers(&cards, payload.len()));
    ensure!(
        cards[1].value == format!("{} version {}", entry.specs().name, entry.spec_version()),
        "{}",
        cards[1].value
    );

    let v = s.apply(Action::Approve)?;
    ensure!(v.state == StateTag::Idle, "{:?}", v.error);

    Ok(())
}

/// Recover, export and delete a seed
pub fn seed_lifecycle<S: Session>(s: &mut S, name: &str) -> anyhow::Result<()> {
    s.apply(Action::RecoverSeed)?;
    s.apply(Action::SetSeedName(name.to_string()))?;
    let v = s.apply(Action::SetSeedPhrase(ALICE_PHRASE.into()))?;
    ensure!(v.awaiting_input == Some(InputKind::Confirmation));

    let v = s.apply(Action::ConfirmSeed)?;
    ensure!(v.state == StateTag::Idle, "{:?}", v.error);

    // Export requires authentication
    s.apply(Action::ExportSeed(name.to_string()))?;
    let v = s.apply(Action::Authenticate {
        proof: AuthProof::new("0000"),
        password: None,
    })?;
    ensure!(v.state == StateTag::AwaitingExportAuth);
    ensure!(v.attempts == 1);

    let v = s.apply(authenticate(None))?;
    let phrase = v.secret.ok_or_else(|| anyhow!("missing phrase"))?;
    ensure!(phrase.as_str() == ALICE_PHRASE);

    let v = s.apply(Action::DeleteSeed {
        name: name.to_string(),
        proof: AuthProof::new(PIN),
    })?;
    ensure!(v.error.is_none(), "{:?}", v.error);

    // Seed is gone
    let v = s.apply(Action::ExportSeed(name.to_string()))?;
    ensure!(v.state == StateTag::Idle && v.error.is_some());

    Ok(())
}
