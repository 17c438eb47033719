//! # Passkey Authentication Client
//!
//! A platform-agnostic client core for passkey (WebAuthn/FIDO2) and password
//! sign-up/sign-in through a platform credential broker, with simple local
//! session state.
//!
//! ## Key Concepts
//! - **Ceremony**: one complete registration or authentication attempt,
//!   mediated by the platform credential broker
//! - **Credential broker**: the platform component (Android
//!   `CredentialManager`, browser `navigator.credentials`) that owns
//!   credential storage, consent UI, and the cryptography
//! - **Relying party**: the server that issues challenges and verifies
//!   credential responses
//!
//! ## Shape of a ceremony
//! ```text
//! identity generator -> request builder -> broker adapter -> interpreter -> session state
//! ```
//! Identifiers and challenges are generated fresh per attempt, substituted
//! into the server-issued descriptor, and the filled request goes to the
//! broker - the one suspension point. The broker's single tagged outcome is
//! classified once at that boundary and drives the session transition.
//!
//! The actual cryptographic ceremony (key generation, challenge signing,
//! attestation) happens entirely outside this crate, inside the broker and
//! the relying party. Both are injected traits; [`mock`] provides the in-repo
//! stand-ins the demo binary and tests run against.

pub mod broker;
pub mod ceremony;
pub mod config;
pub mod error;
pub mod identity;
pub mod mock;
pub mod request;
pub mod rp;
pub mod session;

pub use broker::{CeremonyOutcome, CredentialBroker};
pub use ceremony::{CeremonyOrchestrator, CeremonyPhase, SessionTransition};
pub use error::{AuthError, AuthResult};
pub use identity::{ChallengeNonce, UserIdentifier, CHALLENGE_LEN, USER_ID_LEN};
pub use request::{
    build_authentication_request, build_password_registration_request,
    build_registration_request, CeremonyKind, CeremonyRequest, RelyingPartyChallenge,
};
pub use session::{FileSessionStore, SessionState, SessionStore, SignInMethod};
