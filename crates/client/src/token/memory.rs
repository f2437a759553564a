// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::RwLock;

use super::{StoredSession, TokenPair, TokenStore, UserIdentity};

/// Process-local token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token pair.
    pub fn with_tokens(pair: &TokenPair) -> Self {
        let mut session = StoredSession::default();
        session.set_tokens(pair);
        Self { inner: RwLock::new(session) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.read().refresh_token.clone()
    }

    fn set_tokens(&self, pair: &TokenPair) -> anyhow::Result<()> {
        self.inner.write().set_tokens(pair);
        Ok(())
    }

    fn identity(&self) -> Option<UserIdentity> {
        self.inner.read().user.clone()
    }

    fn set_identity(&self, identity: &UserIdentity) -> anyhow::Result<()> {
        self.inner.write().user = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.inner.write() = StoredSession::default();
        Ok(())
    }
}
