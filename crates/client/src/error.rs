// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::time::Duration;

use crate::transport::TransportError;

/// Why a token refresh episode ended without a new access token.
///
/// Cloned once per waiter: every caller queued behind the same refresh sees
/// the same value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The backend definitively rejected the refresh token.
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
    #[error("refresh endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    /// No refresh token was stored when authorization failed.
    #[error("no refresh token available")]
    NoRefreshToken,
    /// The new token pair could not be written to the token store.
    #[error("failed to persist refreshed tokens: {0}")]
    Persist(String),
    /// An explicit logout ended the episode.
    #[error("logged out{}", reason_suffix(.0))]
    LoggedOut(Option<String>),
    /// The refresh task went away without settling.
    #[error("refresh abandoned")]
    Abandoned,
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(": {r}"),
        None => String::new(),
    }
}

/// Errors returned by [`crate::client::HttpClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The session could not be renewed; the session has been terminated.
    #[error("session expired: {0}")]
    RefreshFailed(#[from] RefreshError),
    /// The request was rejected again after replaying it with a fresh token.
    #[error("unauthorized after token refresh ({status}): {body}")]
    DoubleFailure { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Non-success status on a checked response.
    #[error("request failed ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("token store failure: {0}")]
    Store(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RefreshFailed(_) => ErrorKind::RefreshFailed,
            Self::DoubleFailure { .. } => ErrorKind::DoubleFailure,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// True when the user must re-authenticate.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::RefreshFailed(_))
    }
}

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RefreshFailed,
    DoubleFailure,
    Transport,
    Status,
    Decode,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::DoubleFailure => "DOUBLE_FAILURE",
            Self::Transport => "TRANSPORT",
            Self::Status => "STATUS",
            Self::Decode => "DECODE",
            Self::Store => "STORE",
        }
    }

    /// Process exit code used by the `uxa` binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RefreshFailed => 3,
            Self::DoubleFailure => 4,
            Self::Transport => 5,
            Self::Status => 1,
            Self::Decode => 1,
            Self::Store => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
