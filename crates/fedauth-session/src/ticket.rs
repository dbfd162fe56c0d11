//! The session payload carried in the cookie.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// An authenticated session, as persisted client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTicket {
    /// Local account identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Email address, when the identity provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Name of the trusted issuer that vouched for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// When the session was established.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl SessionTicket {
    /// Creates a ticket starting now.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        email: Option<String>,
        lifetime: Duration,
    ) -> Self {
        let issued_at = Utc::now();
        Self {
            user_id: user_id.into(),
            username: username.into(),
            email,
            issuer: None,
            issued_at,
            expires_at: issued_at + lifetime,
        }
    }

    /// Records the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Whether the ticket has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds until expiry, clamped at zero.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    /// Serializes to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> SessionResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses JSON bytes and rejects expired tickets.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a ticket or the ticket expired.
    pub fn from_bytes(bytes: &[u8]) -> SessionResult<Self> {
        let ticket: Self = serde_json::from_slice(bytes)?;
        if ticket.is_expired_at(Utc::now()) {
            return Err(SessionError::Expired);
        }
        Ok(ticket)
    }
}
