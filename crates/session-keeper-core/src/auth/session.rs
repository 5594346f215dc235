use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// An authenticated identity window issued by the identity provider.
///
/// A `Session` is never mutated after construction: every login replaces it
/// and logout replaces it with "no session".
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(TS, Serialize), ts(export))]
#[cfg_attr(feature = "ts", serde(rename_all = "camelCase"))]
pub struct Session {
    email: String,
    user_id: String,
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session, refusing an empty token or an expiry that is not in the future.
    pub fn new(
        email: impl Into<String>,
        user_id: impl Into<String>,
        token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Option<Self> {
        let token = token.into();
        if token.is_empty() || expires_at <= Utc::now() {
            return None;
        }
        Some(Self {
            email: email.into(),
            user_id: user_id.into(),
            token,
            expires_at,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The bearer token, or `None` once the session has expired.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            None
        } else {
            Some(&self.token)
        }
    }

    /// The bearer token regardless of expiry.
    pub fn raw_token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Remaining lifetime; negative once expired.
    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

// Tokens stay out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("token", &format_args!("<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Durable representation of a [`Session`].
///
/// Field names are the storage contract shared with the browser front end.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct PersistedRecord {
    pub email: String,
    pub id: String,
    #[serde(rename = "_token")]
    pub token: String,
    #[serde(rename = "_tokenExpirationDate")]
    pub token_expiration_date: DateTime<Utc>,
}

impl PersistedRecord {
    /// Rebuild the session this record describes, if it is still usable.
    pub fn into_session(self) -> Option<Session> {
        Session::new(self.email, self.id, self.token, self.token_expiration_date)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.token_expiration_date
    }
}

impl fmt::Debug for PersistedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedRecord")
            .field("email", &self.email)
            .field("id", &self.id)
            .field("token", &format_args!("<redacted>"))
            .field("token_expiration_date", &self.token_expiration_date)
            .finish()
    }
}

impl From<&Session> for PersistedRecord {
    fn from(session: &Session) -> Self {
        Self {
            email: session.email.clone(),
            id: session.user_id.clone(),
            token: session.token.clone(),
            token_expiration_date: session.expires_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
