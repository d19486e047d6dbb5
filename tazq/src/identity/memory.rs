//! In-memory identity provider and profile store.
//!
//! Applies the same account rules and messages as the `tazq-identity`
//! service: well-formed email, minimum password length, one account per
//! email. Passwords are kept in plain text; this backend is for tests and
//! offline use only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use tazq_proto::identity::{MIN_PASSWORD_LENGTH, is_well_formed_email, messages};
use tazq_proto::user::User;

use super::{IdentityError, IdentityProvider, ProfileStore, ProviderUser};

struct Account {
    uid: String,
    password: String,
}

/// Identity provider and profile store held in process memory.
pub struct InMemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    profiles: Mutex<HashMap<String, User>>,
    session: watch::Sender<Option<ProviderUser>>,
    next_uid: AtomicU64,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentity {
    /// Creates a provider with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            session: watch::Sender::new(None),
            next_uid: AtomicU64::new(1),
        }
    }

    /// Number of accounts created so far.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.lock().len()
    }

    fn start_session(&self, uid: String, email: &str) -> ProviderUser {
        let identity = ProviderUser {
            uid,
            email: Some(email.to_string()),
            display_name: None,
        };
        self.session.send_replace(Some(identity.clone()));
        identity
    }
}

fn provider_error(message: &str) -> IdentityError {
    IdentityError::Provider(message.to_string())
}

impl IdentityProvider for InMemoryIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        if !is_well_formed_email(email) {
            return Err(provider_error(messages::BAD_EMAIL));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(provider_error(messages::WEAK_PASSWORD));
        }
        let uid = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(provider_error(messages::EMAIL_IN_USE));
            }
            let uid = format!("local-{}", self.next_uid.fetch_add(1, Ordering::Relaxed));
            accounts.insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            uid
        };
        Ok(Some(self.start_session(uid, email)))
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<ProviderUser>, IdentityError> {
        if !is_well_formed_email(email) {
            return Err(provider_error(messages::BAD_EMAIL));
        }
        let uid = {
            let accounts = self.accounts.lock();
            let account = accounts
                .get(email)
                .ok_or_else(|| provider_error(messages::NO_SUCH_ACCOUNT))?;
            if account.password != password {
                return Err(provider_error(messages::WRONG_PASSWORD));
            }
            account.uid.clone()
        };
        Ok(Some(self.start_session(uid, email)))
    }

    fn current_user(&self) -> Option<ProviderUser> {
        self.session.borrow().clone()
    }

    fn sign_out(&self) {
        self.session.send_replace(None);
    }

    fn session_changes(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.session.subscribe()
    }
}

impl ProfileStore for InMemoryIdentity {
    async fn put_profile(&self, user: &User) -> Result<(), IdentityError> {
        if self.current_user().is_none() {
            return Err(IdentityError::MissingSession);
        }
        self.profiles.lock().insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<User>, IdentityError> {
        if self.current_user().is_none() {
            return Err(IdentityError::MissingSession);
        }
        Ok(self.profiles.lock().get(uid).cloned())
    }
}
