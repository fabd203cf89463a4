//! Learner sessions.

use chrono::{DateTime, Utc};
use learnhub_commerce::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer token for the cart API. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An authenticated learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: UserId,
    pub token: SessionToken,
    /// `None` means the token does not expire client-side.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn new(user_id: impl Into<UserId>, token: impl Into<SessionToken>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Usable for API calls: non-blank and not expired.
    pub fn is_valid(&self) -> bool {
        !self.token.is_blank() && !self.is_expired()
    }
}
