use std::sync::{Arc, Mutex};

use reqwest::Client;

use crate::{
    config::Config,
    ledger::{Ledger, utc_today},
    vault::Vault,
};

/// Process-wide shared state. Ledger and vault mutations are short
/// synchronous critical sections; neither lock is ever held across an await.
pub struct State {
    pub config: Config,
    pub ledger: Mutex<Ledger>,
    pub vault: Mutex<Vault>,
    pub http: Client,
}

impl State {
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::load())
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            ledger: Mutex::new(Ledger::new(utc_today())),
            vault: Mutex::new(Vault::new()),
            http: Client::new(),
        })
    }
}
