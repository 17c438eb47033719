//! # Passkey Authentication Client Demo
//!
//! Walks the full credential ceremony flow of the client core against the
//! in-repo mocks: password sign-up, passkey sign-up, sign-out, and sign-in
//! with a saved credential.
//!
//! The mock relying party serves descriptors from `assets/` and approves
//! every credential response; the mock broker stands in for the platform
//! credential manager. Session state is persisted to a JSON file, so a
//! second run starts signed in - the same restore-on-launch routing a real
//! client performs at startup.

use anyhow::Result;
use passkey_auth_client::ceremony::CeremonyOrchestrator;
use passkey_auth_client::config::Config;
use passkey_auth_client::mock::{MockCredentialBroker, MockRelyingParty};
use passkey_auth_client::rp::LogNotifier;
use passkey_auth_client::session::FileSessionStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging, filterable with RUST_LOG.
    // Default: info for everything, debug for this crate.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_auth_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("configuration loaded: {:?}", config);

    // Wire the core to the in-repo collaborators. In a real client the
    // broker would wrap the platform credential manager and the relying
    // party would be an HTTP client.
    let broker = MockCredentialBroker::new();
    let relying_party = MockRelyingParty::from_asset_dir(&config.asset_dir);
    let sessions = FileSessionStore::new(&config.session_file);
    let mut orchestrator =
        CeremonyOrchestrator::new(broker, relying_party, sessions, LogNotifier).await?;

    // Startup routing: a persisted session from an earlier run means we
    // start signed in, the way a UI would route straight to its home screen.
    if orchestrator.session().is_signed_in() {
        tracing::info!(
            method = ?orchestrator.session().method(),
            since = orchestrator.session().signed_in_at().unwrap_or("unknown"),
            "restored a signed-in session; signing out to run the demo from scratch"
        );
        orchestrator.sign_out().await?;
    }

    // Sign up with a password, saved through the password provider.
    let transition = orchestrator
        .register_with_password("alice", "correct horse battery staple")
        .await?;
    tracing::info!(?transition, "password sign-up concluded");
    orchestrator.sign_out().await?;

    // Sign up with a passkey: fresh user handle and challenge are generated,
    // substituted into the server descriptor, and the response is verified
    // with the relying party before the session flips.
    let transition = orchestrator
        .register_with_passkey("alice", "Alice Smith")
        .await?;
    tracing::info!(?transition, "passkey sign-up concluded");
    orchestrator.sign_out().await?;

    // Sign in with whatever the broker has saved. The passkey wins over the
    // password; the fallback flag only matters when no passkey matches.
    let transition = orchestrator.sign_in(config.password_fallback).await?;
    tracing::info!(?transition, "sign-in concluded");

    tracing::info!(
        signed_in = orchestrator.session().is_signed_in(),
        method = ?orchestrator.session().method(),
        "final session state (persisted to {})",
        config.session_file.display()
    );

    Ok(())
}
