//! # Token Vault
//!
//! One-time redeemable tokens mapping to a follow-up resource URL.
//!
//! A successful generation issues a token the client later trades for its
//! cover image, so the browser never sees the upstream URL or credential.
//! Tokens are v4 UUIDs from the OS CSPRNG. Redemption is destructive: the
//! entry is removed before fulfillment is attempted, so a token can never be
//! redeemed twice. A periodic sweep reaps expired entries as memory hygiene;
//! `redeem` already self-cleans, so the sweep is never load-bearing.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use uuid::Uuid;

pub const COVER_TTL: Duration = Duration::from_secs(5 * 60);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Fulfilled(String),
    NotFound,
    Expired,
}

struct TokenEntry {
    resource: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct Vault {
    tokens: HashMap<String, TokenEntry>,
}

impl Vault {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    pub fn issue(&mut self, resource: String, ttl: Duration) -> String {
        let token = Uuid::new_v4().simple().to_string();

        self.tokens.insert(
            token.clone(),
            TokenEntry {
                resource,
                expires_at: Instant::now() + ttl,
            },
        );

        token
    }

    /// The entry is removed up front, before expiry is even checked, so the
    /// token is spent whether or not the caller's follow-up fetch succeeds.
    pub fn redeem(&mut self, token: &str) -> Redemption {
        match self.tokens.remove(token) {
            None => Redemption::NotFound,
            Some(entry) if Instant::now() >= entry.expires_at => Redemption::Expired,
            Some(entry) => Redemption::Fulfilled(entry.resource),
        }
    }

    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.tokens.len();

        self.tokens.retain(|_, entry| entry.expires_at > now);

        before - self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
