//! Integration tests for the identity store and the auth controller.
//!
//! Uses the in-memory identity backend plus small stubs for provider
//! behavior the real backends never show (accepting a call but returning
//! no identity, a failing profile store).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use tazq::auth::AuthController;
use tazq::identity::{
    IdentityError, IdentityProvider, IdentityStore, InMemoryIdentity, ProfileStore, ProviderUser,
};
use tazq_proto::user::{AuthState, User};

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// Provider that accepts every call and never returns an identity.
struct SilentProvider {
    session: watch::Sender<Option<ProviderUser>>,
}

impl SilentProvider {
    fn new() -> Self {
        Self {
            session: watch::Sender::new(None),
        }
    }
}

impl IdentityProvider for SilentProvider {
    async fn create_account(
        &self,
        _: &str,
        _: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        Ok(None)
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Option<ProviderUser>, IdentityError> {
        Ok(None)
    }

    fn current_user(&self) -> Option<ProviderUser> {
        None
    }

    fn sign_out(&self) {}

    fn session_changes(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.session.subscribe()
    }
}

/// Profile store that refuses writes and records what it was asked.
#[derive(Default)]
struct FailingProfiles {
    writes: Mutex<Vec<User>>,
}

impl ProfileStore for FailingProfiles {
    async fn put_profile(&self, user: &User) -> Result<(), IdentityError> {
        self.writes.lock().push(user.clone());
        Err(IdentityError::Provider("quota exceeded".to_string()))
    }

    async fn get_profile(&self, _: &str) -> Result<Option<User>, IdentityError> {
        Ok(None)
    }
}

fn in_memory() -> (Arc<InMemoryIdentity>, IdentityStore<InMemoryIdentity, InMemoryIdentity>) {
    let backend = Arc::new(InMemoryIdentity::new());
    let store = IdentityStore::new(Arc::clone(&backend), Arc::clone(&backend));
    (backend, store)
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_in_without_identity_is_authentication_failed() {
    let store = IdentityStore::new(
        Arc::new(SilentProvider::new()),
        Arc::new(InMemoryIdentity::new()),
    );
    let err = store.sign_in("a@b.com", "pw").await.unwrap_err();
    assert!(matches!(err, IdentityError::AuthenticationFailed));
    assert_eq!(err.to_string(), "Authentication failed");
}

#[tokio::test]
async fn sign_up_without_identity_is_creation_failed() {
    let profiles = Arc::new(FailingProfiles::default());
    let store = IdentityStore::new(Arc::new(SilentProvider::new()), Arc::clone(&profiles));
    let err = store.sign_up("Ann", "a@b.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), "User creation failed");
    assert!(profiles.writes.lock().is_empty());
}

#[tokio::test]
async fn sign_up_writes_the_profile_document() {
    let (backend, store) = in_memory();
    let user = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    assert_eq!(user.name, "Ann");
    assert_eq!(user.email, "ann@example.com");

    let profile = backend.get_profile(&user.uid).await.unwrap();
    assert_eq!(profile, Some(user.clone()));
    assert_eq!(store.current_user().map(|u| u.uid), Some(user.uid));
}

#[tokio::test]
async fn failed_profile_write_keeps_the_account() {
    let provider = Arc::new(InMemoryIdentity::new());
    let profiles = Arc::new(FailingProfiles::default());
    let store = IdentityStore::new(Arc::clone(&provider), Arc::clone(&profiles));

    let err = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(provider.account_count(), 1);
    let attempted = profiles.writes.lock().clone();
    assert_eq!(attempted.len(), 1);
    assert_eq!(attempted[0].name, "Ann");
}

#[tokio::test]
async fn missing_profile_is_synthesized_on_sign_in() {
    let (backend, store) = in_memory();
    // Account exists but no profile document was ever written.
    backend.create_account("ann@example.com", "secret1").await.unwrap();
    store.sign_out();

    let user = store.sign_in("ann@example.com", "secret1").await.unwrap();
    assert_eq!(user.name, "");
    assert_eq!(user.email, "ann@example.com");
    assert!(!user.uid.is_empty());
}

#[tokio::test]
async fn provider_errors_pass_through_verbatim() {
    let (_, store) = in_memory();
    store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    let err = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The email address is already in use by another account."
    );

    let err = store.sign_in("ann@example.com", "not-it").await.unwrap_err();
    assert!(matches!(err, IdentityError::Provider(_)));
}

#[tokio::test]
async fn session_changes_are_notified() {
    let (_, store) = in_memory();
    let mut changes = store.session_changes();
    assert!(changes.borrow_and_update().is_none());

    store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().is_some());

    store.sign_out();
    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().is_none());
    assert!(store.current_user().is_none());
}

// ---------------------------------------------------------------------------
// Auth controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn controller_reports_authentication_failed() {
    let store = IdentityStore::new(
        Arc::new(SilentProvider::new()),
        Arc::new(InMemoryIdentity::new()),
    );
    let auth = AuthController::new(Arc::new(store));
    auth.sign_in("a@b.com", "pw").await.unwrap();
    assert_eq!(auth.state(), AuthState::Error("Authentication failed".to_string()));
}

#[tokio::test]
async fn controller_walks_through_sign_in_states() {
    let (_, store) = in_memory();
    let auth = AuthController::new(Arc::new(store));
    let mut rx = auth.subscribe();
    assert_eq!(*rx.borrow_and_update(), AuthState::Loading);

    auth.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    let user = auth.state().user().cloned().unwrap();
    assert_eq!(user.name, "Ann");

    auth.sign_out();
    assert_eq!(auth.state(), AuthState::SignedOut);

    let pending = auth.sign_in("ann@example.com", "secret1");
    assert!(auth.state().is_loading());
    pending.await.unwrap();
    // The stored profile wins over the provider's bare identity.
    assert_eq!(auth.state(), AuthState::Success(user));

    auth.sign_in("ann@example.com", "wrong-password").await.unwrap();
    assert!(matches!(auth.state(), AuthState::Error(_)));
}
