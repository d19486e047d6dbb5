//! Sign-in state machine for the presentation layer.
//!
//! [`AuthController`] starts at [`AuthState::Loading`]. Sign-up and sign-in
//! move back to `Loading`, call the [`IdentityStore`] on a spawned task and
//! settle on `Success` or `Error` once it answers. Sign-out lands in
//! [`AuthState::SignedOut`].

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tazq_proto::user::{AuthState, User};

use crate::identity::{IdentityError, IdentityProvider, IdentityStore, ProfileStore};
use crate::tasks::message_or;

const SIGN_UP_FALLBACK: &str = "Sign up failed";
const SIGN_IN_FALLBACK: &str = "Sign in failed";

/// Drives [`AuthState`] from identity calls.
pub struct AuthController<P: IdentityProvider, D: ProfileStore> {
    identity: Arc<IdentityStore<P, D>>,
    state: Arc<watch::Sender<AuthState>>,
}

impl<P: IdentityProvider, D: ProfileStore> AuthController<P, D> {
    /// Starts in [`AuthState::Loading`] until an intent or
    /// [`restore_session`](Self::restore_session) settles it.
    #[must_use]
    pub fn new(identity: Arc<IdentityStore<P, D>>) -> Self {
        Self {
            identity,
            state: Arc::new(watch::Sender::new(AuthState::Loading)),
        }
    }

    /// Creates an account and its profile.
    pub fn sign_up(&self, name: &str, email: &str, password: &str) -> JoinHandle<()> {
        self.state.send_replace(AuthState::Loading);
        let identity = Arc::clone(&self.identity);
        let state = Arc::clone(&self.state);
        let (name, email, password) = (name.to_string(), email.to_string(), password.to_string());
        tokio::spawn(async move {
            let result = identity.sign_up(&name, &email, &password).await;
            settle(&state, result, SIGN_UP_FALLBACK);
        })
    }

    /// Signs in an existing account.
    pub fn sign_in(&self, email: &str, password: &str) -> JoinHandle<()> {
        self.state.send_replace(AuthState::Loading);
        let identity = Arc::clone(&self.identity);
        let state = Arc::clone(&self.state);
        let (email, password) = (email.to_string(), password.to_string());
        tokio::spawn(async move {
            let result = identity.sign_in(&email, &password).await;
            settle(&state, result, SIGN_IN_FALLBACK);
        })
    }

    /// Drops the session. Always ends in [`AuthState::SignedOut`].
    pub fn sign_out(&self) {
        self.identity.sign_out();
        self.state.send_replace(AuthState::SignedOut);
    }

    /// Adopts the provider's cached session, if any, without a network call.
    pub fn restore_session(&self) {
        let next = self
            .identity
            .current_user()
            .map_or(AuthState::SignedOut, AuthState::Success);
        self.state.send_replace(next);
    }

    /// Receiver of every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }
}

fn settle(state: &watch::Sender<AuthState>, result: Result<User, IdentityError>, fallback: &str) {
    let next = match result {
        Ok(user) => AuthState::Success(user),
        Err(e) => {
            tracing::warn!(error = %e, "{fallback}");
            AuthState::Error(message_or(&e, fallback))
        }
    };
    state.send_replace(next);
}
