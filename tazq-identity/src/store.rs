//! In-memory accounts, bearer sessions and profile documents.
//!
//! Passwords are kept as salted SHA-256 digests. Uids, salts and tokens are
//! random UUIDs. Nothing survives a restart.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use tazq_proto::identity::{MIN_PASSWORD_LENGTH, is_well_formed_email, messages};
use tazq_proto::user::User;

/// Reasons an account, session or profile call is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// The email is not shaped like `local@domain.tld`.
    #[error("{}", messages::BAD_EMAIL)]
    BadEmail,
    /// The password is shorter than the configured minimum.
    #[error("Password should be at least {0} characters")]
    WeakPassword(usize),
    /// Another account already uses this email.
    #[error("{}", messages::EMAIL_IN_USE)]
    EmailInUse,
    /// No account has this email.
    #[error("{}", messages::NO_SUCH_ACCOUNT)]
    NoSuchAccount,
    /// The password does not match.
    #[error("{}", messages::WRONG_PASSWORD)]
    WrongPassword,
    /// Missing or unknown bearer token.
    #[error("{}", messages::UNAUTHORIZED)]
    Unauthorized,
    /// The token belongs to another uid.
    #[error("{}", messages::FORBIDDEN)]
    Forbidden,
}

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Account uid.
    pub uid: String,
    /// Email the account was created with.
    pub email: String,
    /// Bearer token for profile calls and sign-out.
    pub token: String,
}

struct Account {
    uid: String,
    salt: String,
    digest: String,
}

#[derive(Default)]
struct Tables {
    /// Email -> account.
    accounts: HashMap<String, Account>,
    /// Token -> uid.
    sessions: HashMap<String, String>,
    /// Uid -> profile document.
    profiles: HashMap<String, User>,
}

/// Account, session and profile tables behind one lock.
pub struct AccountStore {
    tables: RwLock<Tables>,
    min_password_len: usize,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    /// Creates an empty store enforcing the default password length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_password_len(MIN_PASSWORD_LENGTH)
    }

    /// Creates an empty store enforcing `min_password_len` characters.
    #[must_use]
    pub fn with_min_password_len(min_password_len: usize) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            min_password_len,
        }
    }

    /// Creates an account and opens a session for it.
    ///
    /// # Errors
    ///
    /// [`AccountError::BadEmail`], [`AccountError::WeakPassword`] or
    /// [`AccountError::EmailInUse`].
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        if !is_well_formed_email(email) {
            return Err(AccountError::BadEmail);
        }
        if password.chars().count() < self.min_password_len {
            return Err(AccountError::WeakPassword(self.min_password_len));
        }

        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(email) {
            return Err(AccountError::EmailInUse);
        }
        let salt = Uuid::new_v4().simple().to_string();
        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            digest: digest(&salt, password),
            salt,
        };
        let uid = account.uid.clone();
        tables.accounts.insert(email.to_string(), account);
        let token = issue_token(&mut tables, &uid);
        drop(tables);

        tracing::info!(uid = %uid, "account created");
        Ok(Session {
            uid,
            email: email.to_string(),
            token,
        })
    }

    /// Checks the password and opens a new session.
    ///
    /// # Errors
    ///
    /// [`AccountError::BadEmail`], [`AccountError::NoSuchAccount`] or
    /// [`AccountError::WrongPassword`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        if !is_well_formed_email(email) {
            return Err(AccountError::BadEmail);
        }
        let mut tables = self.tables.write().await;
        let account = tables.accounts.get(email).ok_or(AccountError::NoSuchAccount)?;
        if digest(&account.salt, password) != account.digest {
            tracing::debug!(uid = %account.uid, "wrong password");
            return Err(AccountError::WrongPassword);
        }
        let uid = account.uid.clone();
        let token = issue_token(&mut tables, &uid);
        drop(tables);

        tracing::info!(uid = %uid, "session opened");
        Ok(Session {
            uid,
            email: email.to_string(),
            token,
        })
    }

    /// Ends the session of `token`.
    ///
    /// # Errors
    ///
    /// [`AccountError::Unauthorized`] if the token is unknown.
    pub async fn revoke(&self, token: &str) -> Result<(), AccountError> {
        let uid = self
            .tables
            .write()
            .await
            .sessions
            .remove(token)
            .ok_or(AccountError::Unauthorized)?;
        tracing::info!(uid = %uid, "session revoked");
        Ok(())
    }

    /// Writes the profile document of `uid`. The document's own `uid` is
    /// forced to match.
    ///
    /// # Errors
    ///
    /// [`AccountError::Unauthorized`] for an unknown token,
    /// [`AccountError::Forbidden`] if the token belongs to another uid.
    pub async fn put_profile(
        &self,
        token: &str,
        uid: &str,
        mut profile: User,
    ) -> Result<(), AccountError> {
        let mut tables = self.tables.write().await;
        authorize(&tables, token, uid)?;
        uid.clone_into(&mut profile.uid);
        tables.profiles.insert(uid.to_string(), profile);
        drop(tables);
        tracing::debug!(uid, "profile stored");
        Ok(())
    }

    /// Reads the profile document of `uid`.
    ///
    /// # Errors
    ///
    /// [`AccountError::Unauthorized`] for an unknown token.
    pub async fn get_profile(&self, token: &str, uid: &str) -> Result<Option<User>, AccountError> {
        let tables = self.tables.read().await;
        if !tables.sessions.contains_key(token) {
            return Err(AccountError::Unauthorized);
        }
        Ok(tables.profiles.get(uid).cloned())
    }

    /// Number of registered accounts.
    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn issue_token(tables: &mut Tables, uid: &str) -> String {
    let token = Uuid::new_v4().to_string();
    tables.sessions.insert(token.clone(), uid.to_string());
    token
}

fn authorize(tables: &Tables, token: &str, uid: &str) -> Result<(), AccountError> {
    match tables.sessions.get(token) {
        None => Err(AccountError::Unauthorized),
        Some(owner) if owner != uid => Err(AccountError::Forbidden),
        Some(_) => Ok(()),
    }
}
