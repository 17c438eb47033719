//! # Mock Collaborators
//!
//! In-repo stand-ins for the two external parties of a ceremony: the
//! relying-party server and the platform credential broker. The demo binary
//! and the test suites run entirely against these.
//!
//! The mock relying party serves descriptors from static JSON assets
//! (`RegFromServer.json` / `AuthFromServer.json`) and approves every
//! credential response. The mock broker keeps registered credentials in
//! memory and fabricates
//! plausible response JSON; tests can also script exact outcomes to exercise
//! every failure branch.
//!
//! Being demo/test doubles, these types prefer panicking on internal misuse
//! (poisoned locks) over threading errors through the ceremony API.

use async_trait::async_trait;
use base64::prelude::*;
use rand::{rngs::OsRng, RngCore};
use serde_json::json;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::broker::{CeremonyOutcome, CredentialBroker};
use crate::error::{AuthError, AuthResult};
use crate::request::{CeremonyKind, CeremonyRequest, RelyingPartyChallenge};
use crate::rp::{ChallengeSource, CredentialVerifier};

/// Where the mock relying party gets its descriptors
enum DescriptorSource {
    /// Read `RegFromServer.json` / `AuthFromServer.json` from a directory
    Assets(PathBuf),
    /// Fixed in-memory descriptor text
    Inline {
        registration: String,
        authentication: String,
    },
}

/// Mock relying-party server
///
/// Issues descriptors and rubber-stamps verification. The verdict can be
/// flipped to exercise the server-rejection path.
pub struct MockRelyingParty {
    source: DescriptorSource,
    verdict: bool,
}

impl MockRelyingParty {
    /// Serve the JSON assets found in `dir`
    pub fn from_asset_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: DescriptorSource::Assets(dir.into()),
            verdict: true,
        }
    }

    /// Serve fixed descriptor text
    pub fn with_descriptors(
        registration: impl Into<String>,
        authentication: impl Into<String>,
    ) -> Self {
        Self {
            source: DescriptorSource::Inline {
                registration: registration.into(),
                authentication: authentication.into(),
            },
            verdict: true,
        }
    }

    /// Make `verify` report the given verdict instead of always passing
    pub fn with_verdict(mut self, verdict: bool) -> Self {
        self.verdict = verdict;
        self
    }
}

#[async_trait]
impl ChallengeSource for MockRelyingParty {
    async fn fetch_challenge(&self, kind: CeremonyKind) -> AuthResult<RelyingPartyChallenge> {
        let raw = match &self.source {
            DescriptorSource::Assets(dir) => {
                let file = match kind {
                    CeremonyKind::Registration => "RegFromServer.json",
                    CeremonyKind::Authentication => "AuthFromServer.json",
                };
                let path = dir.join(file);
                tokio::fs::read_to_string(&path).await.map_err(|e| {
                    AuthError::ChallengeSource(format!("read {}: {e}", path.display()))
                })?
            }
            DescriptorSource::Inline {
                registration,
                authentication,
            } => match kind {
                CeremonyKind::Registration => registration.clone(),
                CeremonyKind::Authentication => authentication.clone(),
            },
        };
        RelyingPartyChallenge::from_json(raw)
    }
}

#[async_trait]
impl CredentialVerifier for MockRelyingParty {
    async fn verify(&self, _kind: CeremonyKind, _response_json: &str) -> AuthResult<bool> {
        Ok(self.verdict)
    }
}

/// A credential saved in the mock broker's store
#[derive(Debug, Clone, Default)]
struct SavedCredentials {
    /// (user handle, username) of the registered passkey
    passkey: Option<(String, String)>,
    /// (username, password) stored with the password provider
    password: Option<(String, String)>,
}

/// Mock platform credential broker
///
/// Two modes, checked in order per invocation:
/// 1. **Scripted**: outcomes queued through [`push_outcome`] are returned
///    first-in-first-out, one per call. This is how tests drive the
///    cancellation and failure branches.
/// 2. **Behavioral**: with an empty script, registrations are stored in
///    memory and authentications answered from the store - passkey first,
///    password only when the request allows the fallback, and a retryable
///    failure when nothing matches.
///
/// Every request is recorded for inspection, whatever mode answered it.
///
/// [`push_outcome`]: MockCredentialBroker::push_outcome
#[derive(Default)]
pub struct MockCredentialBroker {
    scripted: Mutex<VecDeque<CeremonyOutcome>>,
    saved: Mutex<SavedCredentials>,
    invocations: Mutex<Vec<CeremonyRequest>>,
}

impl MockCredentialBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for a future invocation
    pub async fn push_outcome(&self, outcome: CeremonyOutcome) {
        self.scripted.lock().await.push_back(outcome);
    }

    /// Every request this broker has been invoked with, oldest first
    pub async fn invocations(&self) -> Vec<CeremonyRequest> {
        self.invocations.lock().await.clone()
    }

    async fn behavioral_outcome(&self, request: &CeremonyRequest) -> CeremonyOutcome {
        match request {
            CeremonyRequest::Registration {
                payload,
                user_id,
                username,
                ..
            } => {
                let challenge = extract_challenge(payload);
                self.saved.lock().await.passkey =
                    Some((user_id.as_str().to_owned(), username.clone()));
                CeremonyOutcome::PasskeyCredential {
                    response_json: fabricate_attestation_response(&challenge),
                }
            }
            CeremonyRequest::PasswordRegistration { username, password } => {
                self.saved.lock().await.password = Some((username.clone(), password.clone()));
                CeremonyOutcome::PasswordCredential {
                    username: username.clone(),
                    password: password.clone(),
                }
            }
            CeremonyRequest::Authentication {
                payload,
                allow_password_fallback,
            } => {
                let challenge = extract_challenge(payload);
                let saved = self.saved.lock().await;
                if let Some((user_handle, _)) = &saved.passkey {
                    CeremonyOutcome::PasskeyCredential {
                        response_json: fabricate_assertion_response(&challenge, user_handle),
                    }
                } else if let (true, Some((username, password))) =
                    (*allow_password_fallback, &saved.password)
                {
                    CeremonyOutcome::PasswordCredential {
                        username: username.clone(),
                        password: password.clone(),
                    }
                } else {
                    CeremonyOutcome::RetryableFailure {
                        reason: "no saved credentials match the request".into(),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl CredentialBroker for MockCredentialBroker {
    async fn invoke(&self, request: CeremonyRequest) -> CeremonyOutcome {
        let outcome = match self.scripted.lock().await.pop_front() {
            Some(scripted) => scripted,
            None => self.behavioral_outcome(&request).await,
        };
        self.invocations.lock().await.push(request);
        outcome
    }
}

/// Pull the `challenge` field out of a request payload, empty if absent
fn extract_challenge(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("challenge").and_then(|c| c.as_str()).map(String::from))
        .unwrap_or_default()
}

fn random_credential_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// A plausible `navigator.credentials.create()`-shaped response
fn fabricate_attestation_response(challenge: &str) -> String {
    let id = random_credential_id();
    let client_data = json!({
        "type": "webauthn.create",
        "challenge": challenge,
        "origin": "https://demo.example.com",
        "crossOrigin": false,
    });
    json!({
        "id": id,
        "rawId": id,
        "type": "public-key",
        "authenticatorAttachment": "platform",
        "response": {
            "clientDataJSON": BASE64_URL_SAFE_NO_PAD.encode(client_data.to_string()),
            "attestationObject": BASE64_URL_SAFE_NO_PAD.encode(b"mock-attestation"),
        },
    })
    .to_string()
}

/// A plausible `navigator.credentials.get()`-shaped response
fn fabricate_assertion_response(challenge: &str, user_handle: &str) -> String {
    let id = random_credential_id();
    let client_data = json!({
        "type": "webauthn.get",
        "challenge": challenge,
        "origin": "https://demo.example.com",
        "crossOrigin": false,
    });
    json!({
        "id": id,
        "rawId": id,
        "type": "public-key",
        "authenticatorAttachment": "platform",
        "response": {
            "clientDataJSON": BASE64_URL_SAFE_NO_PAD.encode(client_data.to_string()),
            "authenticatorData": BASE64_URL_SAFE_NO_PAD.encode(b"mock-authenticator-data"),
            "signature": BASE64_URL_SAFE_NO_PAD.encode(b"mock-signature"),
            "userHandle": user_handle,
        },
    })
    .to_string()
}

/// In-memory session store for tests
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<Option<crate::session::SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last state saved, if any
    pub async fn persisted(&self) -> Option<crate::session::SessionState> {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl crate::session::SessionStore for MemorySessionStore {
    async fn load(&self) -> AuthResult<crate::session::SessionState> {
        Ok(self
            .state
            .lock()
            .await
            .clone()
            .unwrap_or_else(crate::session::SessionState::signed_out))
    }

    async fn save(&self, state: &crate::session::SessionState) -> AuthResult<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

/// Notifier that records every message for assertions
#[derive(Default)]
pub struct RecordingNotifier {
    messages: std::sync::Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("notifier lock").clone()
    }
}

impl crate::rp::Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier lock")
            .push(message.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REG: &str = r#"{"challenge":"<challenge>","user":{"id":"<userId>","name":"<userName>","displayName":"<userDisplayName>"}}"#;
    const AUTH: &str = r#"{"challenge":"auth-challenge","allowCredentials":[]}"#;

    #[tokio::test]
    async fn inline_relying_party_serves_both_kinds() {
        let rp = MockRelyingParty::with_descriptors(REG, AUTH);
        let reg = rp.fetch_challenge(CeremonyKind::Registration).await.unwrap();
        assert!(reg.as_str().contains("<challenge>"));
        let auth = rp
            .fetch_challenge(CeremonyKind::Authentication)
            .await
            .unwrap();
        assert!(auth.as_str().contains("auth-challenge"));
    }

    #[tokio::test]
    async fn missing_asset_is_a_challenge_source_failure() {
        let rp = MockRelyingParty::from_asset_dir("/nonexistent-asset-dir");
        let err = rp
            .fetch_challenge(CeremonyKind::Registration)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ChallengeSource(_)));
    }

    #[tokio::test]
    async fn broker_registration_then_authentication_round_trip() {
        let broker = MockCredentialBroker::new();
        let rp = MockRelyingParty::with_descriptors(REG, AUTH);

        let descriptor = rp.fetch_challenge(CeremonyKind::Registration).await.unwrap();
        let request = crate::request::build_registration_request(
            &descriptor,
            crate::identity::UserIdentifier::generate(),
            crate::identity::ChallengeNonce::generate(),
            "alice",
            "Alice",
        )
        .unwrap();

        let outcome = broker.invoke(request).await;
        let CeremonyOutcome::PasskeyCredential { response_json } = outcome else {
            panic!("expected a passkey credential, got {outcome:?}");
        };
        let response: serde_json::Value = serde_json::from_str(&response_json).unwrap();
        assert_eq!(response["type"], "public-key");

        let descriptor = rp
            .fetch_challenge(CeremonyKind::Authentication)
            .await
            .unwrap();
        let request = crate::request::build_authentication_request(&descriptor, false);
        let outcome = broker.invoke(request).await;
        assert!(matches!(outcome, CeremonyOutcome::PasskeyCredential { .. }));
        assert_eq!(broker.invocations().await.len(), 2);
    }

    #[tokio::test]
    async fn password_fallback_respects_the_request_flag() {
        let broker = MockCredentialBroker::new();
        broker
            .invoke(crate::request::build_password_registration_request(
                "alice", "hunter2",
            ))
            .await;

        let rp = MockRelyingParty::with_descriptors(REG, AUTH);
        let descriptor = rp
            .fetch_challenge(CeremonyKind::Authentication)
            .await
            .unwrap();

        let denied = broker
            .invoke(crate::request::build_authentication_request(
                &descriptor,
                false,
            ))
            .await;
        assert!(matches!(denied, CeremonyOutcome::RetryableFailure { .. }));

        let granted = broker
            .invoke(crate::request::build_authentication_request(
                &descriptor,
                true,
            ))
            .await;
        match granted {
            CeremonyOutcome::PasswordCredential { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "hunter2");
            }
            other => panic!("expected the saved password, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scripted_outcomes_take_priority() {
        let broker = MockCredentialBroker::new();
        broker.push_outcome(CeremonyOutcome::Cancelled).await;

        let outcome = broker
            .invoke(crate::request::build_password_registration_request(
                "alice", "pw",
            ))
            .await;
        assert_eq!(outcome, CeremonyOutcome::Cancelled);
        // Script drained: behavior takes over again.
        let outcome = broker
            .invoke(crate::request::build_password_registration_request(
                "alice", "pw",
            ))
            .await;
        assert!(matches!(outcome, CeremonyOutcome::PasswordCredential { .. }));
    }
}
