//! Integration tests for the HTTP identity client against an in-process
//! `tazq-identity` server.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use tazq::auth::AuthController;
use tazq::identity::{IdentityError, IdentityProvider, IdentityStore, ProfileStore, RemoteIdentity};
use tazq_identity::server::{IdentityState, start_server, start_server_with_state};
use tazq_identity::store::AccountStore;
use tazq_proto::identity::messages;
use tazq_proto::user::{AuthState, User};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Starts an identity server on an ephemeral port and returns its base URL.
async fn start_identity_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = start_server("127.0.0.1:0").await.unwrap();
    (format!("http://{addr}"), handle)
}

fn remote_store(
    base_url: &str,
) -> (
    Arc<RemoteIdentity>,
    IdentityStore<RemoteIdentity, RemoteIdentity>,
) {
    let remote = Arc::new(RemoteIdentity::new(base_url).unwrap());
    let store = IdentityStore::new(Arc::clone(&remote), Arc::clone(&remote));
    (remote, store)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_up_then_sign_in_reads_the_profile() {
    let (base, _server) = start_identity_server().await;
    let (remote, store) = remote_store(&base);

    let created = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    assert_eq!(created.name, "Ann");
    assert_eq!(remote.get_profile(&created.uid).await.unwrap(), Some(created.clone()));

    store.sign_out();
    assert!(store.current_user().is_none());

    let signed_in = store.sign_in("ann@example.com", "secret1").await.unwrap();
    assert_eq!(signed_in, created);
    assert_eq!(store.current_user().map(|u| u.uid), Some(created.uid));
}

#[tokio::test]
async fn provider_messages_reach_the_caller() {
    let (base, _server) = start_identity_server().await;
    let (_, store) = remote_store(&base);

    let err = store.sign_up("Ann", "ann@example.com", "123").await.unwrap_err();
    assert_eq!(err.to_string(), messages::WEAK_PASSWORD);

    let err = store.sign_up("Ann", "not-an-email", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), messages::BAD_EMAIL);

    store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    let err = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), messages::EMAIL_IN_USE);

    let err = store.sign_in("ann@example.com", "wrong-one").await.unwrap_err();
    assert_eq!(err.to_string(), messages::WRONG_PASSWORD);

    let err = store.sign_in("bob@example.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), messages::NO_SUCH_ACCOUNT);
}

#[tokio::test]
async fn account_without_profile_signs_in_with_empty_name() {
    let (base, _server) = start_identity_server().await;
    let (remote, store) = remote_store(&base);

    remote.create_account("ann@example.com", "secret1").await.unwrap();
    remote.sign_out();

    let user = store.sign_in("ann@example.com", "secret1").await.unwrap();
    assert_eq!(user.name, "");
    assert_eq!(user.email, "ann@example.com");
}

#[tokio::test]
async fn profile_writes_need_a_session() {
    let (base, _server) = start_identity_server().await;
    let remote = RemoteIdentity::new(&base).unwrap();
    let err = remote.put_profile(&User::new("u1", "Ann", "a@b.com")).await.unwrap_err();
    assert!(matches!(err, IdentityError::MissingSession));
}

#[tokio::test]
async fn session_survives_a_restart_through_the_session_file() {
    let (base, _server) = start_identity_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let uid = {
        let remote = Arc::new(
            RemoteIdentity::new(&base)
                .unwrap()
                .with_session_file(&path)
                .unwrap(),
        );
        let store = IdentityStore::new(Arc::clone(&remote), remote);
        store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap().uid
    };
    assert!(path.exists());

    let remote = RemoteIdentity::new(&base).unwrap().with_session_file(&path).unwrap();
    let restored = remote.current_user().unwrap();
    assert_eq!(restored.uid, uid);
    assert_eq!(restored.email.as_deref(), Some("ann@example.com"));

    remote.sign_out();
    assert!(remote.current_user().is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn server_password_policy_is_configurable() {
    let state = Arc::new(IdentityState::with_config(AccountStore::with_min_password_len(10)));
    let (addr, _server) = start_server_with_state("127.0.0.1:0", state).await.unwrap();
    let (_, store) = remote_store(&format!("http://{addr}"));

    let err = store.sign_up("Ann", "ann@example.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), "Password should be at least 10 characters");
    store.sign_up("Ann", "ann@example.com", "long-secret").await.unwrap();
}

#[tokio::test]
async fn auth_controller_over_http() {
    let (base, _server) = start_identity_server().await;
    let (_, store) = remote_store(&base);
    let auth = AuthController::new(Arc::new(store));

    auth.sign_up("Ann", "ann@example.com", "secret1").await.unwrap();
    assert_eq!(auth.state().user().map(|u| u.name.as_str()), Some("Ann"));

    auth.sign_out();
    assert_eq!(auth.state(), AuthState::SignedOut);

    auth.sign_in("ann@example.com", "nope-nope").await.unwrap();
    assert_eq!(auth.state(), AuthState::Error(messages::WRONG_PASSWORD.to_string()));
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_, store) = remote_store(&format!("http://{addr}"));
    let err = store.sign_in("ann@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, IdentityError::Network(_)));
}
