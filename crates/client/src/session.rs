// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session termination and the "session ended" signal.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::token::TokenStore;

/// Events observed by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session is over; the user must log in again.
    Ended { reason: Option<String> },
}

/// Clears the token store and announces the end of a session.
///
/// The store is cleared on every call. The event fires once per session: a
/// repeated call is silent unless tokens were stored again in between.
pub struct SessionTerminator {
    store: Arc<dyn TokenStore>,
    event_tx: broadcast::Sender<SessionEvent>,
    /// True once the current session's end has been announced.
    ended: Mutex<bool>,
}

impl SessionTerminator {
    pub fn new(store: Arc<dyn TokenStore>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(16);
        Arc::new(Self { store, event_tx, ended: Mutex::new(false) })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// End the current session. Returns `false` if it had already ended
    /// and nothing was stored since.
    pub fn terminate(&self, reason: Option<String>) -> bool {
        let mut ended = self.ended.lock();
        let had_tokens = self.store.tokens().is_some();
        if let Err(e) = self.store.clear() {
            warn!("failed to clear token store: {e:#}");
        }
        if *ended && !had_tokens {
            debug!("session already ended");
            return false;
        }
        *ended = true;
        warn!(reason = reason.as_deref().unwrap_or("-"), "session ended");
        let _ = self.event_tx.send(SessionEvent::Ended { reason });
        true
    }

    /// Start a new session after a successful login.
    pub fn rearm(&self) {
        *self.ended.lock() = false;
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.lock()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
