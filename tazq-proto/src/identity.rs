//! JSON bodies exchanged with the identity service.
//!
//! Shared by the `tazq` client and the `tazq-identity` server so both
//! sides agree on field names.

use serde::{Deserialize, Serialize};

/// Path for account creation (`POST`).
pub const ACCOUNTS_PATH: &str = "/v1/accounts";

/// Path for sign-in (`POST`) and sign-out (`DELETE`).
pub const SESSIONS_PATH: &str = "/v1/sessions";

/// Prefix for profile documents, followed by `/{uid}`.
pub const PROFILES_PATH: &str = "/v1/profiles";

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Provider-native failure messages, shared by every provider
/// implementation so users see the same text regardless of backend.
pub mod messages {
    /// Sign-up with an email that already has an account.
    pub const EMAIL_IN_USE: &str = "The email address is already in use by another account.";
    /// Email that does not look like `local@domain`.
    pub const BAD_EMAIL: &str = "The email address is badly formatted.";
    /// Password shorter than [`super::MIN_PASSWORD_LENGTH`].
    pub const WEAK_PASSWORD: &str = "Password should be at least 6 characters";
    /// Sign-in with the wrong password.
    pub const WRONG_PASSWORD: &str =
        "The password is invalid or the user does not have a password.";
    /// Sign-in with an unknown email.
    pub const NO_SUCH_ACCOUNT: &str =
        "There is no user record corresponding to this identifier. The user may have been deleted.";
    /// Missing or unknown bearer token.
    pub const UNAUTHORIZED: &str =
        "The user's credential is no longer valid. The user must sign in again.";
    /// Bearer token belongs to a different uid.
    pub const FORBIDDEN: &str = "Missing or insufficient permissions.";
}

/// Loose `local@domain.tld` shape check applied before creating accounts.
#[must_use]
pub fn is_well_formed_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Email and password pair sent on sign-up and sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password. Only travels in request bodies.
    pub password: String,
}

/// Successful sign-up or sign-in.
///
/// `uid` is optional on the wire: a provider that accepts the credentials
/// but reports no identity is a distinct failure on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Identity id, absent if the provider returned no identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Email the identity is registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name known to the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Bearer token for subsequent calls.
    pub token: String,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message, surfaced to the user verbatim.
    pub error: String,
}

/// Builds the path of the profile document for `uid`.
#[must_use]
pub fn profile_path(uid: &str) -> String {
    format!("{PROFILES_PATH}/{uid}")
}
