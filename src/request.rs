//! # Ceremony Request Builder
//!
//! Assembles registration and authentication requests from a relying-party
//! descriptor plus freshly generated identifiers.
//!
//! The relying party hands us a JSON descriptor with placeholder tokens
//! (`<userId>`, `<challenge>`, `<userName>`, `<userDisplayName>`). Building a
//! registration request is template substitution of those tokens; the
//! descriptor itself stays opaque - this client never interprets the WebAuthn
//! fields inside it, it only fills the blanks and passes the text on to the
//! platform broker.
//!
//! Building is a pure function: no I/O, no side effects. A descriptor missing
//! a required token fails here, at build time, instead of surfacing later as
//! a confusing broker rejection.

use crate::error::{AuthError, AuthResult};
use crate::identity::{ChallengeNonce, UserIdentifier};

/// Placeholder token for the generated user handle.
pub const TOKEN_USER_ID: &str = "<userId>";
/// Placeholder token for the generated challenge nonce.
pub const TOKEN_CHALLENGE: &str = "<challenge>";
/// Placeholder token for the account username.
pub const TOKEN_USER_NAME: &str = "<userName>";
/// Placeholder token for the human-readable display name.
pub const TOKEN_USER_DISPLAY_NAME: &str = "<userDisplayName>";

/// An opaque, server-issued JSON descriptor for one ceremony attempt
///
/// Immutable once fetched, and fetched fresh for every attempt - a retried
/// ceremony never reuses a stale descriptor. The constructor only checks that
/// the text parses as JSON; the WebAuthn contents are the relying party's
/// business, not ours.
#[derive(Debug, Clone)]
pub struct RelyingPartyChallenge {
    raw: String,
}

impl RelyingPartyChallenge {
    /// Wrap descriptor text, rejecting anything that is not well-formed JSON
    pub fn from_json(raw: impl Into<String>) -> AuthResult<Self> {
        let raw = raw.into();
        // Validate shape only; the value is dropped and the verbatim text kept.
        serde_json::from_str::<serde_json::Value>(&raw)?;
        Ok(Self { raw })
    }

    /// The descriptor text, verbatim as the server issued it
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Which kind of ceremony a request drives
///
/// Carried alongside the request so the interpreter knows which relying-party
/// verification endpoint the broker's response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

/// A fully built request for the platform credential broker
///
/// Built immediately before invoking the broker and never persisted. Exactly
/// one [`crate::broker::CeremonyOutcome`] is produced per request; the broker
/// consumes the request by value, which makes reuse a compile error.
#[derive(Debug, Clone)]
pub enum CeremonyRequest {
    /// Create a new passkey credential
    ///
    /// `payload` is the descriptor with all four placeholder tokens
    /// substituted; the individual fields are kept for logging and for
    /// brokers that want them without re-parsing the payload.
    Registration {
        payload: String,
        user_id: UserIdentifier,
        challenge: ChallengeNonce,
        username: String,
        display_name: String,
    },

    /// Save a username/password pair with the user's password provider
    PasswordRegistration { username: String, password: String },

    /// Retrieve a saved credential (passkey, or password if allowed)
    Authentication {
        payload: String,
        allow_password_fallback: bool,
    },
}

impl CeremonyRequest {
    /// The ceremony kind this request drives
    pub fn kind(&self) -> CeremonyKind {
        match self {
            CeremonyRequest::Registration { .. } | CeremonyRequest::PasswordRegistration { .. } => {
                CeremonyKind::Registration
            }
            CeremonyRequest::Authentication { .. } => CeremonyKind::Authentication,
        }
    }
}

/// Build a passkey registration request
///
/// Substitutes the generated user id and challenge plus the account names
/// into the relying-party descriptor. All four tokens must be present;
/// a missing one is a configuration defect surfaced as
/// [`AuthError::MissingPlaceholder`] before the broker is ever involved.
pub fn build_registration_request(
    rp_challenge: &RelyingPartyChallenge,
    user_id: UserIdentifier,
    challenge: ChallengeNonce,
    username: &str,
    display_name: &str,
) -> AuthResult<CeremonyRequest> {
    let payload = substitute(rp_challenge.as_str(), TOKEN_USER_ID, user_id.as_str())?;
    let payload = substitute(&payload, TOKEN_CHALLENGE, challenge.as_str())?;
    let payload = substitute(&payload, TOKEN_USER_NAME, username)?;
    let payload = substitute(&payload, TOKEN_USER_DISPLAY_NAME, display_name)?;

    Ok(CeremonyRequest::Registration {
        payload,
        user_id,
        challenge,
        username: username.to_owned(),
        display_name: display_name.to_owned(),
    })
}

/// Build a password registration request
///
/// No descriptor involved: the password provider stores the pair as-is.
pub fn build_password_registration_request(username: &str, password: &str) -> CeremonyRequest {
    CeremonyRequest::PasswordRegistration {
        username: username.to_owned(),
        password: password.to_owned(),
    }
}

/// Build an authentication request
///
/// The descriptor passes through verbatim - the relying party embeds the
/// authentication challenge itself. `allow_password_fallback` tells the
/// broker whether saved passwords may satisfy the request alongside passkeys.
pub fn build_authentication_request(
    rp_challenge: &RelyingPartyChallenge,
    allow_password_fallback: bool,
) -> CeremonyRequest {
    CeremonyRequest::Authentication {
        payload: rp_challenge.as_str().to_owned(),
        allow_password_fallback,
    }
}

/// Replace every occurrence of `token` in `template`, failing if absent
fn substitute(template: &str, token: &'static str, value: &str) -> AuthResult<String> {
    if !template.contains(token) {
        return Err(AuthError::MissingPlaceholder { token });
    }
    Ok(template.replace(token, value))
}
