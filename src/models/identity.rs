//! Identity and session types issued by the hosted provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated principal representing one end user.
///
/// Issued by the external provider; this crate never creates or mutates
/// identities itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id (primary key for owned records)
    pub id: String,
    /// Email address the account was registered with
    pub email: String,
    /// When the current session was issued
    pub issued_at: DateTime<Utc>,
    /// When the current session expires
    pub expires_at: DateTime<Utc>,
}

/// Time-bounded, refreshable credential proving an [`Identity`]'s
/// authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Provider-issued access token (an HS256 JWT)
    pub access_token: String,
    /// Opaque refresh token, exchangeable for a new session exactly once
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is valid iff the current time is before its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
