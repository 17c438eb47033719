//! # Relying-Party and UI Collaborators
//!
//! Interfaces to everything the ceremony core consumes but does not own:
//! the server that issues challenges and verifies credential responses, and
//! the surface that shows error text to a user.
//!
//! In this repo the relying party is a mock backed by static JSON assets
//! (see [`crate::mock`]); in a real deployment both traits sit in front of
//! HTTP calls to the relying-party server.

use async_trait::async_trait;

use crate::error::AuthResult;
use crate::request::{CeremonyKind, RelyingPartyChallenge};

/// Source of per-ceremony relying-party descriptors
///
/// A descriptor is fetched fresh for every attempt; the core never caches one
/// across ceremonies, so a retry always starts from new server-issued state.
#[async_trait]
pub trait ChallengeSource: Send + Sync {
    /// Fetch the descriptor for one ceremony of the given kind
    async fn fetch_challenge(&self, kind: CeremonyKind) -> AuthResult<RelyingPartyChallenge>;
}

/// Relying-party verification of a broker-produced credential response
///
/// A black box returning pass/fail. The real thing checks signatures and
/// attestation against the challenge it issued; this client only forwards the
/// response JSON verbatim and acts on the verdict. `Ok(false)` means the
/// server examined and rejected the response; `Err` means the verdict could
/// not be obtained at all. Both terminate the ceremony without touching
/// session state.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Submit a credential response for the given ceremony kind
    async fn verify(&self, kind: CeremonyKind, response_json: &str) -> AuthResult<bool>;
}

/// User-facing error surface
///
/// The one UI concern the core drives directly. Messages passed here are
/// pre-sanitized, generic sentences - diagnostic detail stays in the log.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

#[async_trait]
impl<T: ChallengeSource + ?Sized> ChallengeSource for std::sync::Arc<T> {
    async fn fetch_challenge(&self, kind: CeremonyKind) -> AuthResult<RelyingPartyChallenge> {
        (**self).fetch_challenge(kind).await
    }
}

#[async_trait]
impl<T: CredentialVerifier + ?Sized> CredentialVerifier for std::sync::Arc<T> {
    async fn verify(&self, kind: CeremonyKind, response_json: &str) -> AuthResult<bool> {
        (**self).verify(kind, response_json).await
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify_error(&self, message: &str) {
        (**self).notify_error(message)
    }
}

/// A notifier that writes user-facing messages to the log
///
/// Good enough for a headless demo; a real app would show a snackbar.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!(target: "user", "{message}");
    }
}
