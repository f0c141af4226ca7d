// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared fixtures and scenarios for air-gapped signer tests.
//!
//! Scenarios are generic over [Session] for reuse against a bare
//! [Engine][airgap_core::engine::Engine] and the host library.
//!

use airgap_core::engine::{Action, SessionView};

pub mod metadata;

pub mod request;

pub mod scenario;

/// Well known development phrase
pub const ALICE_PHRASE: &str =
    "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

/// Pin accepted by test authenticators
pub const PIN: &str = "1234";

/// Session abstraction for scenario reuse
pub trait Session {
    /// Apply an action, returning the updated view
    fn apply(&mut self, action: Action) -> anyhow::Result<SessionView>;

    /// Fetch the current view
    fn view(&self) -> anyhow::Result<SessionView>;
}

/// Initialise logging for tests
pub fn setup() {
    let _ = simplelog::SimpleLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
    );
}
