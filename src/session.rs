//! # Session State
//!
//! Local sign-in state, plus the persistence seam.
//!
//! The tempting shortcut here is a process-wide mutable flag behind ambient
//! preference storage. Instead the session is an explicitly owned value with
//! single-writer discipline: only the ceremony orchestrator mutates a
//! `SessionState`, and persistence goes through an injected [`SessionStore`]
//! rather than global storage.
//!
//! ## Invariant
//! `signed_in == true` implies `method != SignInMethod::None`. The fields are
//! private and the constructors are the only way to build a state, so the
//! invariant holds by construction. Persisted data that violates it (a
//! hand-edited or corrupted file) is normalized back to signed-out on load.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::AuthResult;

/// How the current session was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInMethod {
    /// Not signed in
    None,
    /// Signed in with a saved password
    Password,
    /// Signed in with a passkey
    Passkey,
}

/// The local session: whether the user is signed in, and how
///
/// Initialized to signed-out on first launch, updated after every successful
/// ceremony, reset on sign-out. The `signed_in_at` timestamp is informational
/// (RFC3339 text, the same shape the rest of the ecosystem persists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    signed_in: bool,
    method: SignInMethod,
    signed_in_at: Option<String>,
}

impl SessionState {
    /// The signed-out state: `{signed_in: false, method: None}`
    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            method: SignInMethod::None,
            signed_in_at: None,
        }
    }

    /// A signed-in state established through `method`
    ///
    /// Panics in debug builds if called with `SignInMethod::None`; that would
    /// break the invariant, and no call site has a reason to do it.
    pub fn signed_in(method: SignInMethod) -> Self {
        debug_assert!(method != SignInMethod::None);
        Self {
            signed_in: true,
            method,
            signed_in_at: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub fn method(&self) -> SignInMethod {
        self.method
    }

    pub fn signed_in_at(&self) -> Option<&str> {
        self.signed_in_at.as_deref()
    }

    /// True if the invariant holds for this value
    ///
    /// Only deserialized data can be inconsistent; states built through the
    /// constructors always pass.
    pub fn is_consistent(&self) -> bool {
        !self.signed_in || self.method != SignInMethod::None
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::signed_out()
    }
}

/// Session persistence
///
/// A simple key-value concern: load the state that survived the last run,
/// save the state after a ceremony concludes or the user signs out.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session; signed-out if nothing was persisted yet
    async fn load(&self) -> AuthResult<SessionState>;

    /// Persist `state`, replacing whatever was stored before
    async fn save(&self, state: &SessionState) -> AuthResult<()>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for std::sync::Arc<T> {
    async fn load(&self) -> AuthResult<SessionState> {
        (**self).load().await
    }

    async fn save(&self, state: &SessionState) -> AuthResult<()> {
        (**self).save(state).await
    }
}

/// File-backed session store (one JSON document)
///
/// Stands in for a platform preference store. The whole file is rewritten on
/// every save; there is nothing in it worth a database.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AuthResult<SessionState> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            // First launch: no file yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionState::signed_out())
            }
            Err(e) => return Err(e.into()),
        };

        let state: SessionState = serde_json::from_str(&raw)?;
        if !state.is_consistent() {
            tracing::warn!(path = %self.path.display(), "inconsistent persisted session, resetting to signed-out");
            return Ok(SessionState::signed_out());
        }
        Ok(state)
    }

    async fn save(&self, state: &SessionState) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn constructors_uphold_the_invariant() {
        assert!(SessionState::signed_out().is_consistent());
        assert!(SessionState::signed_in(SignInMethod::Passkey).is_consistent());
        assert!(SessionState::signed_in(SignInMethod::Password).is_consistent());

        let state = SessionState::signed_in(SignInMethod::Passkey);
        assert!(state.is_signed_in());
        assert_eq!(state.method(), SignInMethod::Passkey);
        assert!(state.signed_in_at().is_some());
    }

    #[tokio::test]
    async fn load_without_a_file_is_signed_out() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        let state = store.load().await.unwrap();
        assert!(!state.is_signed_in());
        assert_eq!(state.method(), SignInMethod::None);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));

        let state = SessionState::signed_in(SignInMethod::Password);
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);

        store.save(&SessionState::signed_out()).await.unwrap();
        assert!(!store.load().await.unwrap().is_signed_in());
    }

    #[tokio::test]
    async fn inconsistent_file_resets_to_signed_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        // signed_in without a method: the invariant violated on disk.
        std::fs::write(
            &path,
            r#"{"signed_in": true, "method": "None", "signed_in_at": null}"#,
        )
        .unwrap();

        let store = FileSessionStore::new(path);
        let state = store.load().await.unwrap();
        assert!(!state.is_signed_in());
    }
}
