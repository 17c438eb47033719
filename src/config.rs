//! # Configuration Management
//!
//! This module handles loading configuration from environment variables,
//! 12-factor style: configuration comes from the environment, with a `.env`
//! file honored for local development.
//!
//! ## Environment Variables
//! - `ASSET_DIR`: directory holding the mock relying-party descriptors
//!   (default: `assets`)
//! - `SESSION_FILE`: path of the persisted session document
//!   (default: `passkey-session.json`)
//! - `PASSWORD_FALLBACK`: whether sign-in may fall back to a saved password
//!   when no passkey matches (default: `true`)

use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Demo client configuration
///
/// All fields are public for easy access from the binary. The relying-party
/// identity (id, origin, name) is deliberately absent: it lives inside the
/// server-issued descriptors, which this client treats as opaque text.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing `RegFromServer.json` and `AuthFromServer.json`
    pub asset_dir: PathBuf,

    /// Where the session state is persisted across runs
    pub session_file: PathBuf,

    /// Allow saved passwords to satisfy a sign-in when no passkey matches
    pub password_fallback: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` first if present (missing files are fine), then reads
    /// each value with a sensible default. Only a malformed
    /// `PASSWORD_FALLBACK` can fail.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            asset_dir: env::var("ASSET_DIR")
                .unwrap_or_else(|_| "assets".to_string())
                .into(),

            session_file: env::var("SESSION_FILE")
                .unwrap_or_else(|_| "passkey-session.json".to_string())
                .into(),

            password_fallback: env::var("PASSWORD_FALLBACK")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
        })
    }
}
