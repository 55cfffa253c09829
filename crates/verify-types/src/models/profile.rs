//! Persisted profile document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Community role chosen at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Mentee account
    #[serde(alias = "mentee")]
    User,
    Mentor,
}

/// Profile document stored per account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub user_type: UserType,
    /// Mirror of the provider's verification flag. Only ever flipped to true.
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile for a freshly created account; the address is unconfirmed.
    pub fn new(
        uid: impl Into<String>,
        email: impl Into<String>,
        user_type: UserType,
        display_name: Option<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            user_type,
            email_verified: false,
            display_name: display_name.filter(|name| !name.trim().is_empty()),
            created_at: Utc::now(),
        }
    }

    /// Apply a partial update. `email_verified` never reverts to false.
    pub fn apply(&mut self, fields: &ProfileFields) {
        self.email_verified |= fields.email_verified;
    }
}

/// Partial update written by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub email_verified: bool,
}

impl ProfileFields {
    pub const VERIFIED: Self = Self { email_verified: true };
}
