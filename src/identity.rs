//! # Challenge/Identity Generator
//!
//! Random, URL-safe, padding-free identifiers for credential ceremonies.
//!
//! Two values are generated fresh for every registration attempt:
//! - **User identifier**: 64 random bytes. Must be unlinkable across attempts,
//!   so it is never reused and never derived from the username.
//! - **Challenge nonce**: 32 random bytes. Single use; a retried ceremony gets
//!   a newly generated nonce, never the stale one.
//!
//! ## Randomness source
//! Both come from the operating system CSPRNG (`rand::rngs::OsRng`). Using a
//! weaker source here is a security defect, not merely a bug: the challenge is
//! what makes a ceremony unreplayable. If the OS RNG is unavailable,
//! `fill_bytes` aborts the process instead of degrading silently - the only
//! place in this crate where panicking is the contract.

use base64::prelude::*;
use rand::{rngs::OsRng, RngCore};

/// Raw length of a generated user identifier, in bytes.
pub const USER_ID_LEN: usize = 64;

/// Raw length of a generated challenge nonce, in bytes.
pub const CHALLENGE_LEN: usize = 32;

/// A per-registration random user handle, base64url encoded without padding
///
/// The encoded form is what gets substituted into the relying-party
/// descriptor and what the platform broker hands back as the user handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentifier(String);

impl UserIdentifier {
    /// Generate a fresh 64-byte identifier from the OS CSPRNG
    pub fn generate() -> Self {
        Self(random_base64url(USER_ID_LEN))
    }

    /// The encoded text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A per-ceremony random challenge nonce, base64url encoded without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeNonce(String);

impl ChallengeNonce {
    /// Generate a fresh 32-byte nonce from the OS CSPRNG
    pub fn generate() -> Self {
        Self(random_base64url(CHALLENGE_LEN))
    }

    /// The encoded text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fill `len` bytes from the OS CSPRNG and encode them base64url, no padding
///
/// Matches the encoding the rest of the WebAuthn ecosystem expects for user
/// handles and challenges (URL_SAFE, NO_PAD, no line wrapping).
fn random_base64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    // Panics if the OS RNG fails; see module docs.
    OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(&bytes)
}
