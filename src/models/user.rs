//! User model for storage and API.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    /// Roles written by older app versions (e.g. "administrator", "staff")
    #[serde(untagged)]
    Other(String),
}

impl Role {
    /// Parse a role name as typed by an admin.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Role cannot be empty".to_string()));
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "admin" => Role::Admin,
            _ => Role::Other(trimmed.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Other(name) => name,
        }
    }

    /// Case-insensitive admin check, "administrator" included.
    pub fn is_admin(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::User => false,
            Role::Other(name) => {
                name.eq_ignore_ascii_case("admin") || name.eq_ignore_ascii_case("administrator")
            }
        }
    }
}

/// ID verification review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// User profile stored in Firestore at `users/{uid}`.
///
/// Documents are created by the mobile app on sign-up, so nearly every field
/// is optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Firebase Auth UID (also used as document ID)
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub id_verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Role used for display and authorization.
    pub fn effective_role(&self) -> Role {
        match (&self.role, self.is_admin) {
            (Some(role), _) => role.clone(),
            (None, Some(true)) => Role::Admin,
            (None, _) => Role::User,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.is_admin == Some(true) || self.role.as_ref().is_some_and(Role::is_admin)
    }

    pub fn is_verified(&self) -> bool {
        self.id_verification_status == Some(VerificationStatus::Approved)
    }

    /// Best available human-readable name.
    pub fn name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.display_name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Unknown user")
    }

    pub fn set_role(&mut self, role: Role, now: DateTime<Utc>) {
        self.is_admin = Some(role.is_admin());
        self.role = Some(role);
        self.updated_at = Some(now);
    }
}

/// User profile as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub is_admin: bool,
    pub id_verification_status: Option<VerificationStatus>,
    pub is_blocked: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name().to_string(),
            phone_number: user.phone_number.clone(),
            role: user.effective_role().as_str().to_string(),
            is_admin: user.is_administrator(),
            id_verification_status: user.id_verification_status,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
        }
    }
}
