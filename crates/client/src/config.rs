// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::command::Command;

/// Connection settings for [`crate::client::HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Backend base URL, e.g. `https://uxa.example.com/api`.
    pub base_url: String,
    pub refresh_path: String,
    pub login_path: String,
    /// Bound on a single refresh call. Exceeding it ends the session.
    pub refresh_timeout: Duration,
    /// Default per-request timeout.
    pub request_timeout: Duration,
}

impl ClientSettings {
    pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
    pub const DEFAULT_LOGIN_PATH: &'static str = "/auth/login";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: Self::DEFAULT_REFRESH_PATH.to_owned(),
            login_path: Self::DEFAULT_LOGIN_PATH.to_owned(),
            refresh_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Command-line client for the UX analysis API.
#[derive(Debug, Parser)]
#[command(name = "uxa", version, about)]
pub struct Config {
    /// Backend base URL.
    #[arg(long, env = "UXA_BASE_URL", default_value = "http://127.0.0.1:8000/api")]
    pub base_url: String,

    /// Path of the stored session file.
    #[arg(long, env = "UXA_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Refresh endpoint path, relative to the base URL.
    #[arg(long, env = "UXA_REFRESH_PATH", default_value = ClientSettings::DEFAULT_REFRESH_PATH)]
    pub refresh_path: String,

    /// Login endpoint path, relative to the base URL.
    #[arg(long, env = "UXA_LOGIN_PATH", default_value = ClientSettings::DEFAULT_LOGIN_PATH)]
    pub login_path: String,

    /// Refresh call timeout in milliseconds.
    #[arg(long, env = "UXA_REFRESH_TIMEOUT_MS", default_value_t = 10_000)]
    pub refresh_timeout_ms: u64,

    /// Request timeout in milliseconds.
    #[arg(long, env = "UXA_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Log filter (e.g. "warn", "uxa_client=debug").
    #[arg(long, env = "UXA_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format: text or json.
    #[arg(long, env = "UXA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("--base-url must be an http(s) URL: {}", self.base_url);
        }
        if self.refresh_timeout_ms == 0 {
            anyhow::bail!("--refresh-timeout-ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be greater than zero");
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            refresh_path: self.refresh_path.clone(),
            login_path: self.login_path.clone(),
            refresh_timeout: Duration::from_millis(self.refresh_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Session file location: `--token-file`, else `session.json` in the
    /// state directory.
    pub fn token_path(&self) -> PathBuf {
        match self.token_file {
            Some(ref path) => path.clone(),
            None => state_dir().join("session.json"),
        }
    }
}

/// Resolve the state directory.
///
/// Checks `UXA_STATE_DIR`, then `$XDG_STATE_HOME/uxa`, then
/// `$HOME/.local/state/uxa`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("UXA_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("uxa");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/uxa");
    }
    PathBuf::from(".uxa")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
