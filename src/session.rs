//! Session context
//!
//! Which cart backend an operation talks to is decided by the session passed
//! to it, never by ambient lookups.

use std::fmt;

use zeroize::Zeroize;

use crate::ids::UserId;

/// Bearer token issued by the remote API.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(**redacted**)")
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Identity of an authenticated shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Signed-in user.
    pub user_id: UserId,
    /// Bearer token for the cart API.
    pub token: BearerToken,
}

/// Who the cart belongs to for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Anonymous visitor; the cart lives in local storage.
    #[default]
    Guest,

    /// Signed-in user; the cart lives on the server.
    Authenticated(Credentials),
}

impl Session {
    /// An authenticated session.
    #[must_use]
    pub fn authenticated(user_id: UserId, token: BearerToken) -> Self {
        Self::Authenticated(Credentials { user_id, token })
    }

    /// Build a session from whatever identity is at hand.
    ///
    /// Both a non-blank token and a user id are required to be authenticated;
    /// anything less is a guest.
    #[must_use]
    pub fn from_parts(token: Option<String>, user_id: Option<u64>) -> Self {
        match (token, user_id) {
            (Some(token), Some(user_id)) if !token.trim().is_empty() => {
                Self::authenticated(UserId::new(user_id), BearerToken::new(token))
            }
            _ => Self::Guest,
        }
    }

    /// Credentials of an authenticated session.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Guest => None,
            Self::Authenticated(credentials) => Some(credentials),
        }
    }

    /// Whether the server cart is in use.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}
