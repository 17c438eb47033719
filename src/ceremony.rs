//! # Ceremony Orchestration
//!
//! The credential ceremony state machine: build a request, hand it to the
//! platform broker, interpret the single tagged outcome, and advance the
//! local session accordingly.
//!
//! ## State machine
//! ```text
//! Idle -> AwaitingBroker -> SignedIn(method)   passkey verified / password saved
//!                        -> Idle               cancelled, or retryable failure
//!                        -> Failed             config/unknown failure, server rejection
//! ```
//! `AwaitingBroker` is entered when the broker is invoked and exited exactly
//! once when it returns. A `Failed` ceremony never touches session state; the
//! next attempt starts from `Idle` with freshly generated identifiers.
//!
//! ## One ceremony at a time
//! Every ceremony operation takes `&mut self`, so two ceremonies can never
//! interleave on one orchestrator - the at-most-one-in-flight rule is the
//! borrow checker's problem, not a runtime flag's.
//!
//! ## Single writer of session state
//! Only this module mutates [`SessionState`]; everything else reads it. A
//! successful ceremony persists the new state through the injected store
//! before the transition is reported.

use uuid::Uuid;

use crate::broker::{CeremonyOutcome, CredentialBroker};
use crate::error::AuthResult;
use crate::identity::{ChallengeNonce, UserIdentifier};
use crate::request::{
    build_authentication_request, build_password_registration_request,
    build_registration_request, CeremonyKind, CeremonyRequest,
};
use crate::rp::{ChallengeSource, CredentialVerifier, Notifier};
use crate::session::{SessionState, SessionStore, SignInMethod};

/// User-facing text for a transient broker failure. Retry is worthwhile.
const MSG_RETRYABLE: &str = "The operation was interrupted. Please try again.";
/// User-facing text when the credential provider is not set up.
const MSG_CONFIGURATION: &str =
    "Sign-in is unavailable because no credential provider is configured on this device.";
/// User-facing text for anything unclassified. Detail goes to the log only.
const MSG_UNKNOWN: &str = "An unknown error occurred. Please try again later.";
/// User-facing text when the relying party rejects a credential response.
const MSG_VERIFICATION: &str = "Your credential could not be verified. Please try again later.";

/// Where the orchestrator is in the current ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyPhase {
    /// No ceremony in flight
    Idle,
    /// Blocked on the platform broker
    AwaitingBroker,
}

/// How a concluded ceremony moved the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Signed in through the given method; session state updated and saved
    SignedIn(SignInMethod),
    /// Back to idle with the session untouched (cancelled or retryable)
    NoChange,
    /// The ceremony failed; session untouched, user notified generically
    Failed,
}

/// Drives registration and authentication ceremonies end to end
///
/// Owns the session state and the collaborator handles: the platform broker,
/// the relying party (challenge source + verifier), the session store, and
/// the user-facing notifier. Construct one per signed-in identity surface;
/// it is cheap and holds no background tasks.
pub struct CeremonyOrchestrator<B, R, S, N> {
    broker: B,
    relying_party: R,
    sessions: S,
    notifier: N,
    session: SessionState,
    phase: CeremonyPhase,
}

impl<B, R, S, N> CeremonyOrchestrator<B, R, S, N>
where
    B: CredentialBroker,
    R: ChallengeSource + CredentialVerifier,
    S: SessionStore,
    N: Notifier,
{
    /// Build an orchestrator, restoring the persisted session
    pub async fn new(broker: B, relying_party: R, sessions: S, notifier: N) -> AuthResult<Self> {
        let session = sessions.load().await?;
        Ok(Self {
            broker,
            relying_party,
            sessions,
            notifier,
            session,
            phase: CeremonyPhase::Idle,
        })
    }

    /// The current session, as last concluded
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The current ceremony phase
    pub fn phase(&self) -> CeremonyPhase {
        self.phase
    }

    /// Sign up with a passkey
    ///
    /// Fetches a fresh registration descriptor, generates a new user handle
    /// and challenge (never reused from an earlier attempt), fills the
    /// descriptor, and runs the ceremony. On success the credential response
    /// is verified with the relying party before the session flips.
    pub async fn register_with_passkey(
        &mut self,
        username: &str,
        display_name: &str,
    ) -> AuthResult<SessionTransition> {
        let rp_challenge = self
            .relying_party
            .fetch_challenge(CeremonyKind::Registration)
            .await?;
        let request = build_registration_request(
            &rp_challenge,
            UserIdentifier::generate(),
            ChallengeNonce::generate(),
            username,
            display_name,
        )?;
        self.run_ceremony(request).await
    }

    /// Sign up with a password, saved through the user's password provider
    pub async fn register_with_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> AuthResult<SessionTransition> {
        let request = build_password_registration_request(username, password);
        self.run_ceremony(request).await
    }

    /// Sign in with a saved credential
    ///
    /// Fetches a fresh authentication descriptor and asks the broker for a
    /// matching credential. With `allow_password_fallback` set, a saved
    /// password may satisfy the request when no passkey does.
    pub async fn sign_in(&mut self, allow_password_fallback: bool) -> AuthResult<SessionTransition> {
        let rp_challenge = self
            .relying_party
            .fetch_challenge(CeremonyKind::Authentication)
            .await?;
        let request = build_authentication_request(&rp_challenge, allow_password_fallback);
        self.run_ceremony(request).await
    }

    /// Sign out: reset the session to signed-out and persist it
    pub async fn sign_out(&mut self) -> AuthResult<()> {
        self.session = SessionState::signed_out();
        self.sessions.save(&self.session).await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Run one ceremony: invoke the broker, interpret its single outcome
    async fn run_ceremony(&mut self, request: CeremonyRequest) -> AuthResult<SessionTransition> {
        let ceremony_id = Uuid::new_v4();
        let kind = request.kind();
        tracing::debug!(%ceremony_id, ?kind, "invoking credential broker");

        self.phase = CeremonyPhase::AwaitingBroker;
        let outcome = self.broker.invoke(request).await;
        // Exited exactly once, whatever the outcome was.
        self.phase = CeremonyPhase::Idle;

        self.interpret(ceremony_id, kind, outcome).await
    }

    /// Classify the outcome and drive the session transition
    async fn interpret(
        &mut self,
        ceremony_id: Uuid,
        kind: CeremonyKind,
        outcome: CeremonyOutcome,
    ) -> AuthResult<SessionTransition> {
        match outcome {
            CeremonyOutcome::PasskeyCredential { response_json } => {
                // The sign-in is not final until the relying party accepts
                // the response. A rejection (or an unreachable verifier)
                // downgrades to Failed with the session untouched.
                match self.relying_party.verify(kind, &response_json).await {
                    Ok(true) => {
                        tracing::info!(%ceremony_id, ?kind, "passkey ceremony verified");
                        self.commit(SignInMethod::Passkey).await
                    }
                    Ok(false) => {
                        tracing::warn!(%ceremony_id, ?kind, "relying party rejected credential response");
                        self.notifier.notify_error(MSG_VERIFICATION);
                        Ok(SessionTransition::Failed)
                    }
                    Err(e) => {
                        tracing::error!(%ceremony_id, ?kind, error = %e, "credential verification unavailable");
                        self.notifier.notify_error(MSG_VERIFICATION);
                        Ok(SessionTransition::Failed)
                    }
                }
            }
            CeremonyOutcome::PasswordCredential { username, .. } => {
                // Password ceremonies are not independently re-verified.
                tracing::info!(%ceremony_id, ?kind, %username, "password ceremony completed");
                self.commit(SignInMethod::Password).await
            }
            CeremonyOutcome::Cancelled => {
                // Expected outcome, not an error: nothing surfaced.
                tracing::info!(%ceremony_id, ?kind, "ceremony cancelled by user");
                Ok(SessionTransition::NoChange)
            }
            CeremonyOutcome::RetryableFailure { reason } => {
                tracing::warn!(%ceremony_id, ?kind, %reason, "retryable broker failure");
                self.notifier.notify_error(MSG_RETRYABLE);
                Ok(SessionTransition::NoChange)
            }
            CeremonyOutcome::ConfigurationFailure { reason } => {
                tracing::error!(%ceremony_id, ?kind, %reason, "credential provider misconfigured");
                self.notifier.notify_error(MSG_CONFIGURATION);
                Ok(SessionTransition::Failed)
            }
            CeremonyOutcome::UnknownFailure { reason } => {
                tracing::error!(%ceremony_id, ?kind, %reason, "unclassified broker failure");
                self.notifier.notify_error(MSG_UNKNOWN);
                Ok(SessionTransition::Failed)
            }
        }
    }

    /// Flip the session to signed-in and persist before reporting
    async fn commit(&mut self, method: SignInMethod) -> AuthResult<SessionTransition> {
        self.session = SessionState::signed_in(method);
        self.sessions.save(&self.session).await?;
        Ok(SessionTransition::SignedIn(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemorySessionStore, MockCredentialBroker, MockRelyingParty, RecordingNotifier};
    use std::sync::Arc;

    const REG: &str = r#"{"challenge":"<challenge>","user":{"id":"<userId>","name":"<userName>","displayName":"<userDisplayName>"}}"#;
    const AUTH: &str = r#"{"challenge":"auth-challenge","allowCredentials":[]}"#;

    type TestOrchestrator = CeremonyOrchestrator<
        Arc<MockCredentialBroker>,
        MockRelyingParty,
        Arc<MemorySessionStore>,
        Arc<RecordingNotifier>,
    >;

    struct Harness {
        broker: Arc<MockCredentialBroker>,
        sessions: Arc<MemorySessionStore>,
        notifier: Arc<RecordingNotifier>,
        orchestrator: TestOrchestrator,
    }

    async fn harness() -> Harness {
        harness_with_rp(MockRelyingParty::with_descriptors(REG, AUTH)).await
    }

    async fn harness_with_rp(rp: MockRelyingParty) -> Harness {
        let broker = Arc::new(MockCredentialBroker::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let orchestrator = CeremonyOrchestrator::new(
            Arc::clone(&broker),
            rp,
            Arc::clone(&sessions),
            Arc::clone(&notifier),
        )
        .await
        .unwrap();
        Harness {
            broker,
            sessions,
            notifier,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn passkey_registration_signs_in_and_persists() {
        let mut h = harness().await;
        let transition = h
            .orchestrator
            .register_with_passkey("alice", "Alice Smith")
            .await
            .unwrap();

        assert_eq!(transition, SessionTransition::SignedIn(SignInMethod::Passkey));
        assert!(h.orchestrator.session().is_signed_in());
        assert_eq!(h.orchestrator.session().method(), SignInMethod::Passkey);
        assert_eq!(
            h.sessions.persisted().await.unwrap().method(),
            SignInMethod::Passkey
        );
        assert_eq!(h.orchestrator.phase(), CeremonyPhase::Idle);
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn password_registration_signs_in_without_verification() {
        let mut h = harness().await;
        let transition = h
            .orchestrator
            .register_with_password("alice", "hunter2")
            .await
            .unwrap();

        assert_eq!(
            transition,
            SessionTransition::SignedIn(SignInMethod::Password)
        );
        assert_eq!(
            h.sessions.persisted().await.unwrap().method(),
            SignInMethod::Password
        );
    }

    #[tokio::test]
    async fn cancellation_returns_to_idle_with_session_unchanged() {
        let mut h = harness().await;
        h.broker.push_outcome(CeremonyOutcome::Cancelled).await;

        let transition = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap();

        assert_eq!(transition, SessionTransition::NoChange);
        assert!(!h.orchestrator.session().is_signed_in());
        assert_eq!(h.orchestrator.phase(), CeremonyPhase::Idle);
        // Cancellation is an expected outcome: no persisted write, no message.
        assert!(h.sessions.persisted().await.is_none());
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn retryable_failure_allows_retry_with_fresh_identifiers() {
        let mut h = harness().await;
        h.broker
            .push_outcome(CeremonyOutcome::RetryableFailure {
                reason: "broker process restarted".into(),
            })
            .await;

        let first = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap();
        assert_eq!(first, SessionTransition::NoChange);
        assert_eq!(h.notifier.messages().len(), 1);

        let second = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap();
        assert_eq!(
            second,
            SessionTransition::SignedIn(SignInMethod::Passkey)
        );

        // The retried ceremony was built from new identifiers, not the
        // stale ones of the failed attempt.
        let invocations = h.broker.invocations().await;
        assert_eq!(invocations.len(), 2);
        let challenge_of = |req: &CeremonyRequest| match req {
            CeremonyRequest::Registration {
                challenge, user_id, ..
            } => (challenge.as_str().to_owned(), user_id.as_str().to_owned()),
            other => panic!("expected registration requests, got {other:?}"),
        };
        let (c1, u1) = challenge_of(&invocations[0]);
        let (c2, u2) = challenge_of(&invocations[1]);
        assert_ne!(c1, c2);
        assert_ne!(u1, u2);
    }

    #[tokio::test]
    async fn configuration_failure_fails_without_leaking_diagnostics() {
        let mut h = harness().await;
        let reason = "missing credentials-play-services-auth dependency";
        h.broker
            .push_outcome(CeremonyOutcome::ConfigurationFailure {
                reason: reason.into(),
            })
            .await;

        let transition = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap();

        assert_eq!(transition, SessionTransition::Failed);
        assert!(!h.orchestrator.session().is_signed_in());
        assert!(h.sessions.persisted().await.is_none());

        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].contains(reason));
        assert!(!messages[0].contains("play-services"));
    }

    #[tokio::test]
    async fn unknown_failure_fails_generically() {
        let mut h = harness().await;
        h.broker
            .push_outcome(CeremonyOutcome::UnknownFailure {
                reason: "java.lang.RuntimeException: ???".into(),
            })
            .await;

        let transition = h.orchestrator.sign_in(true).await.unwrap();
        assert_eq!(transition, SessionTransition::Failed);
        let messages = h.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].contains("RuntimeException"));
    }

    #[tokio::test]
    async fn server_rejection_downgrades_to_failed() {
        let mut h =
            harness_with_rp(MockRelyingParty::with_descriptors(REG, AUTH).with_verdict(false))
                .await;

        let transition = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap();

        assert_eq!(transition, SessionTransition::Failed);
        assert!(!h.orchestrator.session().is_signed_in());
        assert!(h.sessions.persisted().await.is_none());
        assert_eq!(h.notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn sign_in_falls_back_to_password_when_allowed() {
        let mut h = harness().await;
        h.orchestrator
            .register_with_password("alice", "hunter2")
            .await
            .unwrap();
        h.orchestrator.sign_out().await.unwrap();

        let without_fallback = h.orchestrator.sign_in(false).await.unwrap();
        assert_eq!(without_fallback, SessionTransition::NoChange);

        let with_fallback = h.orchestrator.sign_in(true).await.unwrap();
        assert_eq!(
            with_fallback,
            SessionTransition::SignedIn(SignInMethod::Password)
        );
    }

    #[tokio::test]
    async fn sign_out_resets_and_persists() {
        let mut h = harness().await;
        h.orchestrator
            .register_with_password("alice", "hunter2")
            .await
            .unwrap();
        assert!(h.orchestrator.session().is_signed_in());

        h.orchestrator.sign_out().await.unwrap();
        assert!(!h.orchestrator.session().is_signed_in());
        assert_eq!(h.orchestrator.session().method(), SignInMethod::None);
        assert!(!h.sessions.persisted().await.unwrap().is_signed_in());
    }

    #[tokio::test]
    async fn missing_placeholder_fails_before_the_broker_is_invoked() {
        let rp = MockRelyingParty::with_descriptors(
            // No <userId> token anywhere.
            r#"{"challenge":"<challenge>","user":{"name":"<userName>","displayName":"<userDisplayName>"}}"#,
            AUTH,
        );
        let mut h = harness_with_rp(rp).await;

        let err = h
            .orchestrator
            .register_with_passkey("alice", "Alice")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AuthError::MissingPlaceholder { token: "<userId>" }
        ));
        assert!(h.broker.invocations().await.is_empty());
    }
}
