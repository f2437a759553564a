// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file token store with atomic writes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{StoredSession, TokenPair, TokenStore, UserIdentity};

/// Token store backed by a single JSON document.
///
/// Reads are served from memory; every mutation rewrites the whole file.
pub struct FileTokenStore {
    path: PathBuf,
    inner: RwLock<StoredSession>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any existing session.
    ///
    /// A missing file is an empty session. An unreadable or half-written
    /// document is discarded with a warning rather than failing startup.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let session = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<StoredSession>(&data) {
                Ok(mut s) => {
                    if s.normalize() {
                        warn!(path = %path.display(), "stored session had an unpaired token, discarding tokens");
                    }
                    s
                }
                Err(e) => {
                    warn!(path = %path.display(), "failed to parse stored session: {e}");
                    StoredSession::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored session");
                StoredSession::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, inner: RwLock::new(session) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy of the session, write it, then publish it in memory.
    fn update(&self, f: impl FnOnce(&mut StoredSession)) -> anyhow::Result<()> {
        let mut guard = self.inner.write();
        let mut next = guard.clone();
        f(&mut next);
        save(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.read().refresh_token.clone()
    }

    fn set_tokens(&self, pair: &TokenPair) -> anyhow::Result<()> {
        self.update(|s| s.set_tokens(pair))
    }

    fn identity(&self) -> Option<UserIdentity> {
        self.inner.read().user.clone()
    }

    fn set_identity(&self, identity: &UserIdentity) -> anyhow::Result<()> {
        self.update(|s| s.user = Some(identity.clone()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self.inner.write();
        *guard = StoredSession::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write the session atomically (unique tmp file + rename).
///
/// The tmp name carries PID and a counter so two writers never share one.
fn save(path: &Path, session: &StoredSession) -> anyhow::Result<()> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(session)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), "stored session written");
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
