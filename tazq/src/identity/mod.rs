//! Sign-up, sign-in and session lookup.
//!
//! [`IdentityStore`] combines two remote boundaries:
//! - an [`IdentityProvider`] that owns email/password accounts and the
//!   locally cached session
//! - a [`ProfileStore`] holding one profile document per uid
//!
//! Implementations:
//! - [`memory::InMemoryIdentity`]: both roles in process memory
//! - [`remote::RemoteIdentity`]: both roles over HTTP against `tazq-identity`
//!
//! Sign-up is best-effort, not transactional: if writing the profile fails
//! after the account was created, the account stays and the error is
//! returned.

pub mod memory;
pub mod remote;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use tazq_proto::user::User;

pub use memory::InMemoryIdentity;
pub use remote::RemoteIdentity;

/// Errors raised by identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider accepted the sign-up but returned no identity.
    #[error("User creation failed")]
    CreationFailed,

    /// The provider accepted the sign-in but returned no identity.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The provider rejected the call. The message is the provider's own.
    #[error("{0}")]
    Provider(String),

    /// A profile or sign-out call needs a session and none is cached.
    #[error("no signed-in session")]
    MissingSession,

    /// The HTTP round-trip failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured service URL is unusable.
    #[error("invalid identity service url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The on-disk session cache could not be read.
    #[error("session cache error: {0}")]
    SessionCache(String),
}

/// Identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    /// Provider-issued identifier.
    pub uid: String,
    /// Email, if the provider knows it.
    pub email: Option<String>,
    /// Display name, if the provider knows it.
    pub display_name: Option<String>,
}

impl ProviderUser {
    /// Converts to a [`User`], using empty strings for unknown fields.
    #[must_use]
    pub fn to_user(&self) -> User {
        User::new(
            self.uid.clone(),
            self.display_name.clone().unwrap_or_default(),
            self.email.clone().unwrap_or_default(),
        )
    }
}

/// Remote email/password identity provider with a locally cached session.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Creates an account and signs it in.
    ///
    /// `Ok(None)` means the provider accepted the call but returned no
    /// identity.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<ProviderUser>, IdentityError>> + Send;

    /// Signs in an existing account.
    ///
    /// `Ok(None)` means the provider accepted the call but returned no
    /// identity.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<ProviderUser>, IdentityError>> + Send;

    /// The cached session's identity. Never touches the network.
    fn current_user(&self) -> Option<ProviderUser>;

    /// Drops the cached session. Never fails.
    fn sign_out(&self);

    /// Notifies every change of the cached session.
    fn session_changes(&self) -> watch::Receiver<Option<ProviderUser>>;
}

/// Remote document store keyed by uid, one profile per user.
pub trait ProfileStore: Send + Sync + 'static {
    /// Writes (or replaces) the profile of `user.uid`.
    fn put_profile(&self, user: &User) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Reads the profile of `uid`, `None` if no document exists.
    fn get_profile(
        &self,
        uid: &str,
    ) -> impl Future<Output = Result<Option<User>, IdentityError>> + Send;
}

/// Sign-up and sign-in over a provider and a profile store.
pub struct IdentityStore<P: IdentityProvider, D: ProfileStore> {
    provider: Arc<P>,
    profiles: Arc<D>,
}

impl<P: IdentityProvider, D: ProfileStore> IdentityStore<P, D> {
    /// Combines a provider and a profile store.
    #[must_use]
    pub const fn new(provider: Arc<P>, profiles: Arc<D>) -> Self {
        Self { provider, profiles }
    }

    /// Creates an account, then writes its profile document
    /// `{uid, name, email}`.
    ///
    /// # Errors
    ///
    /// [`IdentityError::CreationFailed`] if the provider returned no
    /// identity; otherwise the provider's or profile store's own error.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, IdentityError> {
        let Some(identity) = self.provider.create_account(email, password).await? else {
            tracing::warn!(email, "provider returned no identity on sign-up");
            return Err(IdentityError::CreationFailed);
        };
        let user = User::new(identity.uid, name, email);
        if let Err(e) = self.profiles.put_profile(&user).await {
            tracing::warn!(uid = %user.uid, error = %e, "account created but profile write failed");
            return Err(e);
        }
        tracing::info!(uid = %user.uid, "signed up");
        Ok(user)
    }

    /// Signs in, then loads the profile document.
    ///
    /// A missing profile is not an error: the user is built from the uid and
    /// `email` with an empty name.
    ///
    /// # Errors
    ///
    /// [`IdentityError::AuthenticationFailed`] if the provider returned no
    /// identity; otherwise the provider's or profile store's own error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let Some(identity) = self.provider.sign_in(email, password).await? else {
            tracing::warn!(email, "provider returned no identity on sign-in");
            return Err(IdentityError::AuthenticationFailed);
        };
        let user = match self.profiles.get_profile(&identity.uid).await? {
            Some(profile) => profile,
            None => {
                tracing::debug!(
                    uid = %identity.uid,
                    "no profile document, using provider identity"
                );
                User::new(identity.uid, "", email)
            }
        };
        tracing::info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    /// The cached session's user, without any network call.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.provider.current_user().as_ref().map(ProviderUser::to_user)
    }

    /// Drops the cached session.
    pub fn sign_out(&self) {
        self.provider.sign_out();
        tracing::info!("signed out");
    }

    /// Session-changed notifications from the provider.
    #[must_use]
    pub fn session_changes(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.provider.session_changes()
    }
}
