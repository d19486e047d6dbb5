//! HTTP client for the `tazq-identity` service.
//!
//! Plays both roles of the identity boundary: accounts and sessions under
//! `/v1/accounts` and `/v1/sessions`, profile documents under
//! `/v1/profiles/{uid}`. The bearer token from the last sign-up or sign-in
//! is cached in memory and, when a session file is configured, on disk so
//! a later process starts signed in.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use tazq_proto::identity::{
    ACCOUNTS_PATH, Credentials, ErrorBody, SESSIONS_PATH, SessionResponse, profile_path,
};
use tazq_proto::user::User;

use super::{IdentityError, IdentityProvider, ProfileStore, ProviderUser};

/// Session as cached between calls and across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedSession {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    token: String,
}

impl CachedSession {
    fn identity(&self) -> ProviderUser {
        ProviderUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Identity provider and profile store talking to `tazq-identity`.
pub struct RemoteIdentity {
    base_url: Url,
    http: Client,
    session: RwLock<Option<CachedSession>>,
    changes: watch::Sender<Option<ProviderUser>>,
    session_file: Option<PathBuf>,
}

impl RemoteIdentity {
    /// Creates a client for the service at `base_url` with no cached
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http: Client::new(),
            session: RwLock::new(None),
            changes: watch::Sender::new(None),
            session_file: None,
        })
    }

    /// Persists the session to `path` and restores it from there if the
    /// file already exists.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::SessionCache`] if an existing file cannot be
    /// read or parsed.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Result<Self, IdentityError> {
        let path = path.into();
        if let Some(cached) = read_session_file(&path)? {
            tracing::debug!(uid = %cached.uid, path = %path.display(), "restored cached session");
            self.changes.send_replace(Some(cached.identity()));
            *self.session.get_mut() = Some(cached);
        }
        self.session_file = Some(path);
        Ok(self)
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(self.base_url.join(path)?)
    }

    fn token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.token.clone())
    }

    fn store_session(&self, cached: Option<CachedSession>) {
        if let Some(path) = &self.session_file
            && let Err(e) = write_session_file(path, cached.as_ref())
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist session");
        }
        self.changes.send_replace(cached.as_ref().map(CachedSession::identity));
        *self.session.write() = cached;
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(&credentials)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let session: SessionResponse = response.json().await?;
        let Some(uid) = session.uid else {
            return Ok(None);
        };
        let cached = CachedSession {
            uid,
            email: session.email.or_else(|| Some(email.to_string())),
            display_name: session.display_name,
            token: session.token,
        };
        let identity = cached.identity();
        self.store_session(Some(cached));
        Ok(Some(identity))
    }
}

/// Turns a non-success response into [`IdentityError::Provider`], using the
/// service's `{"error": ...}` body when present.
async fn provider_error(response: Response) -> IdentityError {
    let status = response.status();
    match response.text().await {
        Ok(text) => match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => IdentityError::Provider(body.error),
            Err(_) if text.is_empty() => IdentityError::Provider(status.to_string()),
            Err(_) => IdentityError::Provider(text),
        },
        Err(e) => IdentityError::Network(e),
    }
}

fn read_session_file(path: &Path) -> Result<Option<CachedSession>, IdentityError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(IdentityError::SessionCache(format!("{}: {e}", path.display())));
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| IdentityError::SessionCache(format!("{}: {e}", path.display())))
}

fn write_session_file(path: &Path, session: Option<&CachedSession>) -> std::io::Result<()> {
    let Some(session) = session else {
        return match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(session).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

impl IdentityProvider for RemoteIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        self.authenticate(ACCOUNTS_PATH, email, password).await
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        self.authenticate(SESSIONS_PATH, email, password).await
    }

    fn current_user(&self) -> Option<ProviderUser> {
        self.session.read().as_ref().map(CachedSession::identity)
    }

    fn sign_out(&self) {
        let token = self.token();
        self.store_session(None);

        // Revoking the token server-side is best-effort; the local session
        // is already gone.
        let (Some(token), Ok(handle)) = (token, tokio::runtime::Handle::try_current()) else {
            return;
        };
        let Ok(url) = self.endpoint(SESSIONS_PATH) else {
            return;
        };
        let http = self.http.clone();
        handle.spawn(async move {
            match http.delete(url).bearer_auth(token).send().await {
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "session revoked");
                }
                Err(e) => tracing::debug!(error = %e, "session revoke failed"),
            }
        });
    }

    fn session_changes(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.changes.subscribe()
    }
}

impl ProfileStore for RemoteIdentity {
    async fn put_profile(&self, user: &User) -> Result<(), IdentityError> {
        let token = self.token().ok_or(IdentityError::MissingSession)?;
        let response = self
            .http
            .put(self.endpoint(&profile_path(&user.uid))?)
            .bearer_auth(token)
            .json(user)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }
        tracing::debug!(uid = %user.uid, "profile stored");
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<User>, IdentityError> {
        let mut request = self.http.get(self.endpoint(&profile_path(uid))?);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(provider_error(response).await),
        }
    }
}
