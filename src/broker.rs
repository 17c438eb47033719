//! # Credential Broker Adapter
//!
//! The boundary to the platform credential provider.
//!
//! On Android this is `CredentialManager`, in a browser it is
//! `navigator.credentials`; either way it is an opaque component that owns
//! credential storage, the consent UI (credential picker, biometric prompt),
//! and the cryptographic ceremony itself. This client only sends a request
//! and waits for exactly one response.
//!
//! ## Result classification happens here, once
//! Platform brokers report failure through a zoo of exception types. That zoo
//! is flattened into [`CeremonyOutcome`] at this boundary - a tagged union
//! decided once, so nothing downstream ever branches on a runtime type again:
//!
//! - user closed the picker / declined             -> `Cancelled`
//! - broker process hiccup, interruption           -> `RetryableFailure`
//! - credential-spec violation in our request      -> `RetryableFailure`
//! - provider integration missing or misconfigured -> `ConfigurationFailure`
//! - anything unrecognized                         -> `UnknownFailure`
//!
//! The `reason` strings are operator diagnostics. They go to the log in full
//! and are never shown to users (the interpreter substitutes generic text).

use async_trait::async_trait;

use crate::request::CeremonyRequest;

/// The single result of one broker invocation
///
/// Produced exactly once per [`CeremonyRequest`] and immutable afterwards.
/// Success carries the credential material; every failure carries its
/// category, fixed at the broker boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyOutcome {
    /// The broker completed a passkey ceremony
    ///
    /// `response_json` is the public-key credential response, verbatim. It
    /// must be forwarded to the relying party for verification before the
    /// sign-in is considered final.
    PasskeyCredential { response_json: String },

    /// The broker returned (or stored) a username/password pair
    PasswordCredential { username: String, password: String },

    /// The user intentionally dismissed the ceremony
    ///
    /// Not an error. Expected outcome; surfaced to no one.
    Cancelled,

    /// A transient failure; the caller may retry with a freshly built request
    ///
    /// Stale challenges and user ids must not be reused on retry.
    RetryableFailure { reason: String },

    /// The provider integration is missing or misconfigured
    ///
    /// Not retryable; requires an app or operator fix.
    ConfigurationFailure { reason: String },

    /// Anything the adapter could not classify
    UnknownFailure { reason: String },
}

/// The platform credential broker
///
/// `invoke` is the sole suspension point of a ceremony: it parks the calling
/// task until the platform returns or the user cancels through the platform's
/// own UI (there is no timeout on this side of the boundary).
///
/// Implementations must:
/// - emit exactly one outcome per call, never silently dropping a request;
/// - never retry internally - retry policy belongs to the caller, which
///   rebuilds the request with fresh identifiers first;
/// - classify every failure per the table in the module docs.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Run one ceremony to completion
    ///
    /// Takes the request by value: a request is single-use, and consuming it
    /// makes accidental reuse a compile error.
    async fn invoke(&self, request: CeremonyRequest) -> CeremonyOutcome;
}

#[async_trait]
impl<T: CredentialBroker + ?Sized> CredentialBroker for std::sync::Arc<T> {
    async fn invoke(&self, request: CeremonyRequest) -> CeremonyOutcome {
        (**self).invoke(request).await
    }
}
