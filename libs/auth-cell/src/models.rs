use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkResponse {
    pub message: String,
    pub email: String,
}

/// Clinic-side account record: maps an identity-provider user id to a role.
/// Auto-provisioned with role `patient` on first verified request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub role: AccountRole,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Patient,
    Admin,
}

impl AccountRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Patient => "patient",
            AccountRole::Admin => "admin",
        }
    }
}

/// Result of the explicit provisioning step: states whether the account
/// record existed or was created by this call.
#[derive(Debug, Clone)]
pub enum AccountProvision {
    Existing(Account),
    Created(Account),
}

impl AccountProvision {
    pub fn account(&self) -> &Account {
        match self {
            AccountProvision::Existing(account) => account,
            AccountProvision::Created(account) => account,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, AccountProvision::Created(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: AccountRole,
    pub created_at: Option<DateTime<Utc>>,
}
