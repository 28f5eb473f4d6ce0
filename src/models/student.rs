use serde::{Deserialize, Serialize};

use super::RecordId;

/// Student record. `pass` is kept in plain text, as the portal simulates
/// accounts inside a single local profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub national_id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
}

impl Student {
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        self.national_id.matches(identifier)
            || (!self.email.is_empty() && self.email == identifier)
    }

    /// Public view without the stored password.
    pub fn redacted(mut self) -> Self {
        self.pass = None;
        self
    }
}

/// Canonical identity written to `currentUser` at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub national_id: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}
