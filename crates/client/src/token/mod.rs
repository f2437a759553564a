// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token persistence: access/refresh token pair plus the cached user identity.
//!
//! Stores are thin key-value wrappers. They never refresh, retry, or
//! interpret tokens; the refresh coordinator and the session terminator are
//! their only writers.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use serde::{Deserialize, Serialize};

/// Access and refresh token, always written and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }
}

/// Identity of the logged-in user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Durable holder for the session's tokens and identity.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Persist both tokens as a unit.
    fn set_tokens(&self, pair: &TokenPair) -> anyhow::Result<()>;

    fn identity(&self) -> Option<UserIdentity>;

    fn set_identity(&self, identity: &UserIdentity) -> anyhow::Result<()>;

    /// Remove both tokens and the cached identity.
    fn clear(&self) -> anyhow::Result<()>;

    /// Both tokens, if a session is stored.
    fn tokens(&self) -> Option<TokenPair> {
        Some(TokenPair { access_token: self.access_token()?, refresh_token: self.refresh_token()? })
    }
}

/// On-disk and in-memory shape of a stored session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,
}

impl StoredSession {
    pub(crate) fn set_tokens(&mut self, pair: &TokenPair) {
        self.access_token = Some(pair.access_token.clone());
        self.refresh_token = Some(pair.refresh_token.clone());
    }

    /// Drop a half-written pair so an access token never exists alone.
    pub(crate) fn normalize(&mut self) -> bool {
        let empty = |t: &Option<String>| t.as_deref().map_or(true, str::is_empty);
        if empty(&self.access_token) != empty(&self.refresh_token) {
            self.access_token = None;
            self.refresh_token = None;
            return true;
        }
        if empty(&self.access_token) {
            self.access_token = None;
            self.refresh_token = None;
        }
        false
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
