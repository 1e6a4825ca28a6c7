//! Profile model: one-to-one public metadata for an identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile record, stored in the `profiles` table.
///
/// `id` is immutable and always equals the owning identity's id; a profile
/// is created exactly once, at or after first sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Equals the owning identity's id (primary key)
    pub id: String,
    /// Unique handle, required
    pub username: String,
    /// Display name, optional
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for profile creation.
///
/// Deliberately has no `id` field: the id always comes from the acting
/// identity, never from caller input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}
