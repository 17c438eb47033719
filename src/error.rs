//! # Error Handling
//!
//! This module defines the error types for the authentication client and the
//! policy for what users are allowed to see of them.
//!
//! ## Two layers of failure
//! Ceremony-level failures (cancellation, a flaky broker, a misconfigured
//! provider) are **not** errors here - they are ordinary values of
//! [`crate::broker::CeremonyOutcome`], classified once at the broker boundary.
//! `AuthError` covers everything underneath a ceremony: a descriptor missing a
//! placeholder token, a challenge that cannot be fetched, a session file that
//! cannot be read or written.
//!
//! ## User-facing policy
//! Raw error detail (paths, parser messages, broker diagnostics) is logged for
//! operators and never shown to users. `user_message()` is the single place
//! that maps an error onto the generic text a user may see.

use thiserror::Error;

/// Application-wide error type for the authentication client
///
/// Each variant corresponds to a different category of infrastructure failure.
/// None of these is fatal to the process; every one terminates the current
/// ceremony attempt only.
///
/// ## The `#[from]` attribute
/// Enables automatic conversion with the `?` operator. For example a failing
/// `serde_json::from_str` inside descriptor validation becomes
/// `AuthError::Serialization` without an explicit `map_err`.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A relying-party descriptor is missing a required placeholder token
    ///
    /// Surfaced at request build time, before the broker is ever invoked.
    /// A descriptor without `<challenge>` (or the other tokens) is a
    /// configuration defect on the relying-party side, not a runtime error.
    #[error("descriptor is missing placeholder token {token}")]
    MissingPlaceholder {
        /// The literal token that was absent, e.g. `<userId>`
        token: &'static str,
    },

    /// The relying-party challenge source failed to produce a descriptor
    ///
    /// In this repo the source is a static asset file; in a real system it is
    /// an HTTP call, and this variant would carry the transport failure.
    #[error("challenge source failure: {0}")]
    ChallengeSource(String),

    /// JSON serialization/deserialization errors
    ///
    /// Occurs when a descriptor is not well-formed JSON or the session file
    /// contents cannot be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session persistence I/O errors
    #[error("session store error: {0}")]
    SessionStore(#[from] std::io::Error),

    /// Unexpected internal errors that shouldn't normally occur
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The generic message a user may be shown for this error
    ///
    /// Mirrors the policy applied to ceremony failures: detail goes to the
    /// log, users get a short, non-diagnostic sentence. Nothing returned from
    /// here ever embeds the underlying error text.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::MissingPlaceholder { .. } | AuthError::ChallengeSource(_) => {
                "The sign-in service is misconfigured. Please contact support."
            }
            AuthError::Serialization(_) | AuthError::SessionStore(_) | AuthError::Internal(_) => {
                "Something went wrong. Please try again later."
            }
        }
    }
}

/// Convenience type alias for Results using AuthError
///
/// Instead of writing `Result<SessionTransition, AuthError>` everywhere,
/// we can write `AuthResult<SessionTransition>`.
pub type AuthResult<T> = Result<T, AuthError>;
