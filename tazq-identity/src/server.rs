//! HTTP front end of the identity service.
//!
//! | Route | Success |
//! |-------|---------|
//! | `POST /v1/accounts` | 201 with a session |
//! | `POST /v1/sessions` | 200 with a session |
//! | `DELETE /v1/sessions` | 204 |
//! | `PUT /v1/profiles/{uid}` | 204 |
//! | `GET /v1/profiles/{uid}` | 200 with the profile |
//!
//! Failures answer `{"error": "<message>"}` with a status matching the
//! [`AccountError`] variant.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use tokio::task::JoinHandle;

use tazq_proto::identity::{
    ACCOUNTS_PATH, Credentials, ErrorBody, PROFILES_PATH, SESSIONS_PATH, SessionResponse,
};
use tazq_proto::user::User;

use crate::store::{AccountError, AccountStore, Session};

/// Shared state of a running identity server.
pub struct IdentityState {
    accounts: AccountStore,
}

impl Default for IdentityState {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityState {
    /// Creates server state with an empty account store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AccountStore::new())
    }

    /// Creates server state around an existing account store.
    #[must_use]
    pub const fn with_config(accounts: AccountStore) -> Self {
        Self { accounts }
    }

    /// The account store served by this state.
    #[must_use]
    pub const fn accounts(&self) -> &AccountStore {
        &self.accounts
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadEmail | Self::WeakPassword(_) => StatusCode::BAD_REQUEST,
            Self::EmailInUse => StatusCode::CONFLICT,
            Self::NoSuchAccount => StatusCode::NOT_FOUND,
            Self::WrongPassword | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

fn session_response(session: Session) -> SessionResponse {
    SessionResponse {
        uid: Some(session.uid),
        email: Some(session.email),
        display_name: None,
        token: session.token,
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer(headers: &HeaderMap) -> Result<&str, AccountError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AccountError::Unauthorized)
}

async fn create_account(
    State(state): State<Arc<IdentityState>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<SessionResponse>), AccountError> {
    let session = state
        .accounts
        .create_account(&credentials.email, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session_response(session))))
}

async fn sign_in(
    State(state): State<Arc<IdentityState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>, AccountError> {
    let session = state.accounts.sign_in(&credentials.email, &credentials.password).await?;
    Ok(Json(session_response(session)))
}

async fn sign_out(
    State(state): State<Arc<IdentityState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AccountError> {
    state.accounts.revoke(bearer(&headers)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn put_profile(
    State(state): State<Arc<IdentityState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(profile): Json<User>,
) -> Result<StatusCode, AccountError> {
    state.accounts.put_profile(bearer(&headers)?, &uid, profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_profile(
    State(state): State<Arc<IdentityState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = match bearer(&headers) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    match state.accounts.get_profile(token, &uid).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no profile for {uid}"),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Builds the router over `state`.
pub fn router(state: Arc<IdentityState>) -> Router {
    Router::new()
        .route(ACCOUNTS_PATH, post(create_account))
        .route(SESSIONS_PATH, post(sign_in).delete(sign_out))
        .route(&format!("{PROFILES_PATH}/{{uid}}"), put(put_profile).get(get_profile))
        .with_state(state)
}

/// Start the identity server on the given address with empty state.
///
/// Returns the bound address and a join handle for the server task.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn start_server(
    addr: &str,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_state(addr, Arc::new(IdentityState::new())).await
}

/// Start the identity server with caller-provided state.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<IdentityState>,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "identity server error");
        }
    });

    Ok((bound_addr, handle))
}
