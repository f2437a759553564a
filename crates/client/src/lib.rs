// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated API client for the UX analysis backend.
//!
//! Requests are stamped with the session's access token. When the backend
//! answers 401, a single refresh call renews the token for every request
//! that failed meanwhile; each of them is replayed once. If renewal fails,
//! the session ends and observers of [`session::SessionEvent`] are told.

pub mod authorize;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod refresh;
pub mod session;
pub mod token;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::{HttpClient, LoginRequest};
pub use config::ClientSettings;
pub use error::{ClientError, RefreshError};
pub use session::SessionEvent;
pub use token::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use transport::{ApiRequest, ApiResponse};
