// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh.
//!
//! The first request to see a 401 while idle starts a refresh episode; every
//! other 401 during that episode queues a [`PendingRequest`] behind it. When
//! the refresh settles, the whole queue is released in one batch with the
//! same outcome: the new access token, or the error that ended the session.
//!
//! State transitions happen inside a single `parking_lot` critical section
//! that is never held across an `.await`, so "is a refresh running?" and
//! "enqueue me" cannot interleave with a settlement.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::refresh::TokenRefresher;
use crate::session::SessionTerminator;
use crate::token::{TokenPair, TokenStore};

/// Default bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// A caller waiting on the current episode's outcome.
struct PendingRequest {
    tx: oneshot::Sender<Result<String, RefreshError>>,
}

impl PendingRequest {
    fn resolve(self, access_token: &str) {
        let _ = self.tx.send(Ok(access_token.to_owned()));
    }

    fn reject(self, err: &RefreshError) {
        let _ = self.tx.send(Err(err.clone()));
    }
}

struct RefreshState {
    phase: RefreshPhase,
    /// Bumped when an episode starts or is forcibly ended; a refresh task
    /// whose episode no longer matches has been superseded.
    episode: u64,
    /// Non-empty only while `Refreshing`.
    queue: Vec<PendingRequest>,
}

/// Owns the refresh state for one client.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    terminator: Arc<SessionTerminator>,
    refresh_timeout: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        terminator: Arc<SessionTerminator>,
        refresh_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RefreshState {
                phase: RefreshPhase::Idle,
                episode: 0,
                queue: Vec::new(),
            }),
            store,
            refresher,
            terminator,
            refresh_timeout,
        })
    }

    pub fn phase(&self) -> RefreshPhase {
        self.state.lock().phase
    }

    /// Number of callers waiting on the current episode.
    pub fn waiting(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn terminator(&self) -> &Arc<SessionTerminator> {
        &self.terminator
    }

    /// Obtain a fresh access token after `rejected` was refused with a 401.
    ///
    /// Joins the running episode or starts one. If a refresh already
    /// replaced `rejected` and none is running, returns the stored token
    /// without another refresh call.
    pub async fn recover(self: &Arc<Self>, rejected: Option<&str>) -> Result<String, RefreshError> {
        let rx = {
            let mut state = self.state.lock();
            if state.phase == RefreshPhase::Idle {
                if let Some(current) = self.store.access_token() {
                    if rejected != Some(current.as_str()) {
                        debug!("access token already renewed, skipping refresh");
                        return Ok(current);
                    }
                }
            }

            let (tx, rx) = oneshot::channel();
            state.queue.push(PendingRequest { tx });
            match state.phase {
                RefreshPhase::Refreshing => {
                    debug!(waiters = state.queue.len(), "refresh in flight, queued");
                }
                RefreshPhase::Idle => {
                    state.phase = RefreshPhase::Refreshing;
                    state.episode += 1;
                    let episode = state.episode;
                    debug!(episode, "starting token refresh");
                    // Runs detached so a cancelled caller cannot strand the queue.
                    let this = Arc::clone(self);
                    tokio::spawn(async move {
                        let outcome = this.refresh_tokens().await;
                        this.settle(episode, outcome);
                    });
                }
            }
            rx
        };

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    async fn refresh_tokens(&self) -> Result<TokenPair, RefreshError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(RefreshError::NoRefreshToken);
        };
        match tokio::time::timeout(self.refresh_timeout, self.refresher.refresh(refresh_token)).await
        {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout(self.refresh_timeout)),
        }
    }

    /// Finish an episode: persist or terminate, then release every waiter.
    ///
    /// The store write stays under the state lock so no caller can see
    /// `Idle` next to the rejected token and start a second refresh. For a
    /// file store this is one small blocking write per episode; callers of
    /// `recover` wait on it only while an episode is settling.
    fn settle(&self, episode: u64, outcome: Result<TokenPair, RefreshError>) {
        let mut state = self.state.lock();
        if state.episode != episode || state.phase != RefreshPhase::Refreshing {
            debug!(episode, "refresh episode was superseded, discarding its outcome");
            return;
        }
        let waiters = std::mem::take(&mut state.queue);
        state.phase = RefreshPhase::Idle;

        let outcome = outcome.and_then(|pair| match self.store.set_tokens(&pair) {
            Ok(()) => Ok(pair.access_token),
            Err(e) => Err(RefreshError::Persist(format!("{e:#}"))),
        });
        if let Err(ref err) = outcome {
            self.terminator.terminate(Some(err.to_string()));
        }
        drop(state);

        match outcome {
            Ok(access_token) => {
                info!(waiters = waiters.len(), "access token refreshed");
                for waiter in waiters {
                    waiter.resolve(&access_token);
                }
            }
            Err(err) => {
                warn!(waiters = waiters.len(), err = %err, "token refresh failed");
                for waiter in waiters {
                    waiter.reject(&err);
                }
            }
        }
    }

    /// Forcibly end the session (explicit logout).
    ///
    /// Any running refresh is abandoned and its result never written.
    /// Returns the number of waiters rejected.
    pub fn abort(&self, reason: Option<String>) -> usize {
        let mut state = self.state.lock();
        state.episode += 1;
        state.phase = RefreshPhase::Idle;
        let waiters = std::mem::take(&mut state.queue);
        self.terminator.terminate(reason.clone());
        drop(state);

        let err = RefreshError::LoggedOut(reason);
        let count = waiters.len();
        for waiter in waiters {
            waiter.reject(&err);
        }
        count
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
