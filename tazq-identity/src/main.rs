//! `tazq-identity`: account and profile service for the `tazq` CLI.
//!
//! Keeps accounts, bearer sessions and one profile document per uid in
//! memory. Everything is lost when the process exits, so clients holding a
//! cached session must sign in again after a restart.
//!
//! ```bash
//! cargo run --bin tazq-identity
//! TAZQ_IDENTITY_ADDR=0.0.0.0:9400 cargo run --bin tazq-identity -- --min-password-len 10
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tazq_identity::config::{IdentityCliArgs, IdentityConfig};
use tazq_identity::server::{self, IdentityState};
use tazq_identity::store::AccountStore;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match IdentityConfig::load(&IdentityCliArgs::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tazq-identity: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let accounts = AccountStore::with_min_password_len(config.min_password_len);
    let state = Arc::new(IdentityState::with_config(accounts));
    let (addr, handle) = match server::start_server_with_state(&config.bind_addr, state).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(bind = %config.bind_addr, error = %e, "cannot bind identity service");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        %addr,
        min_password_len = config.min_password_len,
        "accepting sign-ups and sign-ins"
    );

    match handle.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "identity service stopped unexpectedly");
            ExitCode::FAILURE
        }
    }
}
