// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: fake backend, fake refresher, builders.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::authorize::bearer_token;
use crate::client::HttpClient;
use crate::error::RefreshError;
use crate::refresh::{RefreshCoordinator, TokenRefresher};
use crate::session::SessionTerminator;
use crate::token::{MemoryTokenStore, TokenPair, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, Attempt, AuthMode, Transport, TransportError};

/// One request as seen by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub path: String,
    pub token: Option<String>,
    pub attempt: Attempt,
}

/// In-process backend: accepts exactly one access token, 401s everything
/// else. Broken `(path, attempt)` pairs fail at the transport level; slow
/// replays honor the request timeout; paths with a canned reply get it
/// regardless of the token.
#[derive(Default)]
pub struct FakeBackend {
    valid_token: Mutex<Option<String>>,
    broken: Mutex<Vec<(String, Attempt)>>,
    slow_replays: Mutex<Vec<(String, Duration)>>,
    canned: Mutex<Vec<(String, u16, String)>>,
    seen: Mutex<Vec<Seen>>,
}

impl FakeBackend {
    pub fn accepting(token: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.valid_token.lock() = Some(token.to_owned());
        Arc::new(backend)
    }

    pub fn break_path(&self, path: &str) {
        self.broken.lock().push((path.to_owned(), Attempt::First));
    }

    /// First attempts behave normally; the replay fails to connect.
    pub fn break_replay(&self, path: &str) {
        self.broken.lock().push((path.to_owned(), Attempt::Replay));
    }

    /// The replay takes `latency` to answer.
    pub fn slow_replay(&self, path: &str, latency: Duration) {
        self.slow_replays.lock().push((path.to_owned(), latency));
    }

    pub fn reply(&self, path: &str, status: u16, body: &str) {
        self.canned.lock().push((path.to_owned(), status, body.to_owned()));
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn seen_count(&self, path: &str) -> usize {
        self.seen.lock().iter().filter(|s| s.path == path).count()
    }
}

impl Transport for FakeBackend {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + '_>> {
        let token = bearer_token(&request).map(str::to_owned);
        self.seen.lock().push(Seen {
            path: request.path.clone(),
            token: token.clone(),
            attempt: request.attempt(),
        });
        let broken = self
            .broken
            .lock()
            .iter()
            .any(|(p, attempt)| *p == request.path && *attempt == request.attempt());
        let latency = match request.attempt() {
            Attempt::Replay => self
                .slow_replays
                .lock()
                .iter()
                .find(|(p, _)| *p == request.path)
                .map(|(_, latency)| *latency),
            Attempt::First => None,
        };
        let canned = self
            .canned
            .lock()
            .iter()
            .find(|(p, _, _)| *p == request.path)
            .map(|(_, status, body)| (*status, body.clone()));
        let valid = self.valid_token.lock().clone();
        Box::pin(async move {
            tokio::task::yield_now().await;
            if broken {
                return Err(TransportError::Connect("connection refused".to_owned()));
            }
            if let Some(latency) = latency {
                match request.timeout {
                    Some(limit) if limit < latency => {
                        tokio::time::sleep(limit).await;
                        return Err(TransportError::Timeout);
                    }
                    _ => tokio::time::sleep(latency).await,
                }
            }
            if let Some((status, body)) = canned {
                return Ok(ApiResponse::new(status, body));
            }
            if request.auth == AuthMode::Public {
                return Ok(ApiResponse::new(200, format!("public {}", request.path)));
            }
            match (token, valid) {
                (Some(t), Some(v)) if t == v => {
                    Ok(ApiResponse::new(200, format!("{} with {t}", request.path)))
                }
                _ => Ok(ApiResponse::new(401, "token expired")),
            }
        })
    }
}

/// Scripted refresher. Optionally held until [`FakeRefresher::release`].
pub struct FakeRefresher {
    calls: AtomicU32,
    outcome: Mutex<Result<TokenPair, RefreshError>>,
    gate: Option<Notify>,
    seen_refresh_tokens: Mutex<Vec<String>>,
}

impl FakeRefresher {
    pub fn succeeding(pair: TokenPair) -> Self {
        Self {
            calls: AtomicU32::new(0),
            outcome: Mutex::new(Ok(pair)),
            gate: None,
            seen_refresh_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: RefreshError) -> Self {
        Self { outcome: Mutex::new(Err(err)), ..Self::succeeding(TokenPair::new("", "")) }
    }

    /// Hold every refresh until `release()` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(ref gate) = self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().clone()
    }
}

impl TokenRefresher for FakeRefresher {
    fn refresh(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_refresh_tokens.lock().push(refresh_token);
        Box::pin(async move {
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            self.outcome.lock().clone()
        })
    }
}

/// Everything a coordinator or client test needs, wired together.
pub struct Harness {
    pub store: Arc<MemoryTokenStore>,
    pub backend: Arc<FakeBackend>,
    pub refresher: Arc<FakeRefresher>,
    pub terminator: Arc<SessionTerminator>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub client: HttpClient,
}

impl Harness {
    /// Store holds `old`/`refresh-1`; the backend only accepts `backend_token`.
    pub fn new(backend_token: &str, refresher: FakeRefresher) -> Self {
        Self::with_store(
            MemoryTokenStore::with_tokens(&TokenPair::new("old", "refresh-1")),
            backend_token,
            refresher,
            Duration::from_secs(5),
        )
    }

    pub fn with_store(
        store: MemoryTokenStore,
        backend_token: &str,
        refresher: FakeRefresher,
        refresh_timeout: Duration,
    ) -> Self {
        let store = Arc::new(store);
        let backend = FakeBackend::accepting(backend_token);
        let refresher = Arc::new(refresher);
        let terminator = SessionTerminator::new(store.clone());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            refresher.clone(),
            terminator.clone(),
            refresh_timeout,
        );
        let client = HttpClient::new(backend.clone(), coordinator.clone());
        Self { store, backend, refresher, terminator, coordinator, client }
    }

    /// Yield until `n` callers are queued on the coordinator.
    pub async fn wait_for_waiters(&self, n: usize) {
        let coordinator = Arc::clone(&self.coordinator);
        let waited = tokio::time::timeout(Duration::from_secs(5), async move {
            while coordinator.waiting() < n {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {n} queued callers");
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
