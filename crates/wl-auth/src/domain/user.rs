//! User Identity Entity
//!
//! A `User` row is scoped to exactly one tenant. The same email may appear
//! in any number of tenants, each as an independent row with its own
//! password hash, role, and flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to an identity within its tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Employee,
    Candidate,
    Viewer,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
            Role::Candidate => "CANDIDATE",
            Role::Viewer => "VIEWER",
        }
    }
}

/// Tenant summary carried on a user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// A tenant-scoped user identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant: TenantInfo,

    /// Unique within the tenant only
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub role: Role,

    /// Absent for passwordless-only identities
    #[serde(skip_serializing)]
    pub hash: Option<String>,

    /// Active magic code, cleared on consumption
    #[serde(skip_serializing)]
    pub code: Option<String>,
    #[serde(skip_serializing)]
    pub code_expire_at: Option<DateTime<Utc>>,

    /// SHA-256 hex digest of the last issued refresh token
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,

    /// Identifier from an external identity provider, when federated
    pub third_party_id: Option<String>,

    pub last_login_at: Option<DateTime<Utc>>,
    pub last_organization_id: Option<Uuid>,
    pub last_team_id: Option<Uuid>,
    pub email_verified_at: Option<DateTime<Utc>>,

    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(tenant: TenantInfo, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            tenant,
            email: email.into(),
            first_name: None,
            last_name: None,
            image_url: None,
            role,
            hash: None,
            code: None,
            code_expire_at: None,
            refresh_token_hash: None,
            third_party_id: None,
            last_login_at: None,
            last_organization_id: None,
            last_team_id: None,
            email_verified_at: None,
            is_active: true,
            is_archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
            (Some(f), None) => Some(f.clone()),
            (None, Some(l)) => Some(l.clone()),
            (None, None) => None,
        }
    }

    /// Usable for login: active, not archived
    pub fn is_login_eligible(&self) -> bool {
        self.is_active && !self.is_archived
    }

    /// True when the stored code matches and has not expired
    pub fn has_valid_code(&self, code: &str, now: DateTime<Utc>) -> bool {
        use subtle::ConstantTimeEq;

        match (&self.code, self.code_expire_at) {
            (Some(stored), Some(expire_at)) => {
                let matches: bool = stored.as_bytes().ct_eq(code.as_bytes()).into();
                matches && expire_at >= now
            }
            _ => false,
        }
    }
}

/// Sanitized identity surfaced in workspace listings and auth results.
/// Carries no credential or code material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_team_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub tenant: TenantInfo,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
            image_url: user.image_url.clone(),
            last_team_id: user.last_team_id,
            last_login_at: user.last_login_at,
            tenant: user.tenant.clone(),
        }
    }
}
