// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated API client: authorize, send, and recover from 401s.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::authorize::authorize;
use crate::config::ClientSettings;
use crate::error::ClientError;
use crate::refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};
use crate::session::{SessionEvent, SessionTerminator};
use crate::token::{TokenPair, TokenStore, UserIdentity};
use crate::transport::{
    join_url, ApiRequest, ApiResponse, Attempt, AuthMode, ReqwestTransport, Transport,
};

/// Login credentials.
#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserIdentity,
}

/// Request pipeline around a [`Transport`].
///
/// Cheap to clone; clones share the token store and refresh state.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    login_path: String,
}

impl HttpClient {
    /// Assemble a client from an explicitly owned coordinator.
    pub fn new(transport: Arc<dyn Transport>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { transport, coordinator, login_path: ClientSettings::DEFAULT_LOGIN_PATH.to_owned() }
    }

    /// Build the HTTP stack (transport, refresher, terminator, coordinator)
    /// for `settings`.
    pub fn connect(settings: &ClientSettings, store: Arc<dyn TokenStore>) -> Self {
        let transport = Arc::new(ReqwestTransport::new(&settings.base_url, settings.request_timeout));
        let refresher: Arc<dyn TokenRefresher> = Arc::new(HttpTokenRefresher::new(
            join_url(&settings.base_url, &settings.refresh_path),
            settings.refresh_timeout,
        ));
        let terminator = SessionTerminator::new(Arc::clone(&store));
        let coordinator =
            RefreshCoordinator::new(store, refresher, terminator, settings.refresh_timeout);
        Self::new(transport, coordinator).with_login_path(&settings.login_path)
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.coordinator.store()
    }

    /// Observe session-end events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.terminator().subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().tokens().is_some()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.store().identity()
    }

    /// Send a request, refreshing the access token and replaying once on 401.
    ///
    /// Non-401 responses are returned as-is, whatever their status. A 401 on
    /// a replay is final.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut token = match request.auth {
            AuthMode::Bearer => self.store().access_token(),
            AuthMode::Public => None,
        };
        loop {
            let response = self.dispatch(&request, token.as_deref()).await?;
            if request.auth == AuthMode::Public || !response.is_unauthorized() {
                return Ok(response);
            }
            if request.attempt() == Attempt::Replay {
                warn!(path = %request.path, "request rejected again after token refresh");
                return Err(ClientError::DoubleFailure {
                    status: response.status,
                    body: response.text(),
                });
            }

            debug!(path = %request.path, "access token rejected");
            token = Some(self.coordinator.recover(token.as_deref()).await?);
            request = request.into_replay();
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let outgoing = authorize(request.clone(), token);
        let response = self.transport.send(outgoing).await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            replay = request.attempt() == Attempt::Replay,
            "response"
        );
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::post(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// GET `path` and decode a 2xx JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get(path).await?.error_for_status()?.json()
    }

    /// Log in and start a new session.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<UserIdentity, ClientError> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let request = ApiRequest::post(self.login_path.as_str()).json(&body).public();
        let login: LoginResponse = self.send(request).await?.error_for_status()?.json()?;

        let store = self.store();
        store
            .set_tokens(&TokenPair::new(login.access_token, login.refresh_token))
            .map_err(|e| ClientError::Store(format!("{e:#}")))?;
        store.set_identity(&login.user).map_err(|e| ClientError::Store(format!("{e:#}")))?;
        self.coordinator.terminator().rearm();

        info!(user = %login.user.email, "logged in");
        Ok(login.user)
    }

    /// End the session locally. Waiters on an in-flight refresh are rejected.
    pub fn logout(&self, reason: Option<String>) -> usize {
        let rejected = self.coordinator.abort(reason);
        info!(rejected, "logged out");
        rejected
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
