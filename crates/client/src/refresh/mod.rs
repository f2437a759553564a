// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access token renewal: the refresh endpoint call and the single-flight
//! coordinator that guards it.

pub mod coordinator;

pub use coordinator::{RefreshCoordinator, RefreshPhase};

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RefreshError;
use crate::token::TokenPair;

/// Exchanges a refresh token for a new token pair.
///
/// Object-safe for use as `Arc<dyn TokenRefresher>`.
pub trait TokenRefresher: Send + Sync + 'static {
    fn refresh(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + Send + '_>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Refresh endpoint response. A missing refresh token keeps the old one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Calls the backend refresh endpoint over HTTP.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { client, url: url.into() }
    }

    /// Perform a single refresh request. Never retried: any failure is
    /// terminal for the session.
    async fn do_refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status, body });
        }

        let token: RefreshResponse =
            resp.json().await.map_err(|e| RefreshError::Malformed(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(RefreshError::Malformed("empty access token".to_owned()));
        }
        Ok(TokenPair {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or_else(|| refresh_token.to_owned()),
        })
    }
}

impl TokenRefresher for HttpTokenRefresher {
    fn refresh(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + Send + '_>> {
        Box::pin(async move { self.do_refresh(&refresh_token).await })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
