//! Authenticated identity and the sign-in state machine.

use serde::{Deserialize, Serialize};

/// An authenticated user. Also the shape of the profile document stored
/// per uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier issued by the identity provider.
    pub uid: String,
    /// Display name given at sign-up. Empty when no profile exists.
    #[serde(default)]
    pub name: String,
    /// Sign-in email.
    #[serde(default)]
    pub email: String,
}

impl User {
    /// Creates a user record.
    pub fn new(uid: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Authentication state observed by the presentation layer.
///
/// Starts at [`AuthState::Loading`]; a sign-in or sign-up call moves back to
/// `Loading` and then to `Success` or `Error` once the provider answers.
/// Signing out lands in `SignedOut`, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// A call is in flight, or nothing has happened yet.
    #[default]
    Loading,
    /// Signed in as this user.
    Success(User),
    /// The last call failed with this message.
    Error(String),
    /// The user signed out.
    SignedOut,
}

impl AuthState {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Success(user) => Some(user),
            _ => None,
        }
    }

    /// Whether a call is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
