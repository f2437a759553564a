// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer token stamping for outgoing requests.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::warn;

use crate::transport::{ApiRequest, AuthMode};

/// Attach `Authorization: Bearer <token>` to a request.
///
/// Public requests and requests without a token pass through unmodified.
/// Any existing `Authorization` header is replaced.
pub fn authorize(mut request: ApiRequest, token: Option<&str>) -> ApiRequest {
    if request.auth == AuthMode::Public {
        return request;
    }
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return request;
    };
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        Err(_) => {
            warn!(path = %request.path, "access token is not a valid header value, sending without it");
        }
    }
    request
}

/// The bearer token a request carries, if any.
pub fn bearer_token(request: &ApiRequest) -> Option<&str> {
    request.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

#[cfg(test)]
#[path = "authorize_tests.rs"]
mod tests;
