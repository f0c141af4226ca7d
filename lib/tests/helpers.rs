#![allow(unused)]

use std::str::FromStr;

use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use airgap_core::{
    engine::{Action, SessionView},
    registry::Registry,
    vault::{MultiSigner, PinAuthenticator},
};
use airgap_signer::{Config, Navigator, SessionId};
use airgap_tests::{metadata, Session, ALICE_PHRASE, PIN};

/// Setup logging, level from the `LOG_LEVEL` environment variable
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Create a navigator with the sample metadata loaded
pub fn navigator() -> Navigator {
    let n = Navigator::new(Config::default(), PinAuthenticator::new(PIN));
    n.load_metadata(metadata::WESTEND, &metadata::westend_blob())
        .unwrap();
    n
}

/// Import the development phrase and create an address
pub fn with_alice(n: &Navigator, path: &str) -> MultiSigner {
    let v = n.vault();
    let seed = match v.seed_by_name("alice") {
        Ok(s) => s,
        Err(_) => v.import_phrase("alice", ALICE_PHRASE).unwrap(),
    };

    v.create_address(seed, path, &metadata::WESTEND, &metadata::westend_specs())
        .unwrap()
}

/// Navigator session implementing [Session]
pub struct NavigatorSession<'a> {
    pub navigator: &'a Navigator,
    pub id: SessionId,
}

impl<'a> NavigatorSession<'a> {
    pub fn open(navigator: &'a Navigator) -> Self {
        let id = navigator.open_session().unwrap();
        Self { navigator, id }
    }
}

impl<'a> Drop for NavigatorSession<'a> {
    fn drop(&mut self) {
        let _ = self.navigator.close_session(self.id);
    }
}

impl<'a> Session for NavigatorSession<'a> {
    fn apply(&mut self, action: Action) -> anyhow::Result<SessionView> {
        debug!("session {}: {}", self.id, action.kind());

        let v = self.navigator.apply_action(self.id, &action)?;
        Ok(v)
    }

    fn view(&self) -> anyhow::Result<SessionView> {
        let v = self.navigator.view(self.id)?;
        Ok(v)
    }
}
