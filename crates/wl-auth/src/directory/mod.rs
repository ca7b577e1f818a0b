//! Directory Layer
//!
//! Persistence collaborators for the auth core, expressed as async traits
//! so the engine never depends on a storage engine choice. Identity lookup
//! is an explicit resolve-set operation: the same email may match rows in
//! any number of tenants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Employee, Invite, OrganizationMembership, PasswordResetRecord, Role, SocialAccount,
    SocialProvider, TeamMember, TeamSummary, User,
};
use crate::error::Result;

pub mod memory;

pub use memory::InMemoryDirectory;

/// User identity lookup and mutation.
///
/// Methods returning `Vec<User>` order rows newest-created first, so the
/// first row wins any `(email, tenant)` tie-break.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All active, non-archived rows for the email, across tenants
    async fn find_active_by_email(&self, email: &str) -> Result<Vec<User>>;

    /// Active rows whose stored code equals `code` and has not expired
    async fn find_for_code_signin(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_third_party_id(&self, third_party_id: &str) -> Result<Option<User>>;

    async fn find_by_id_in_tenant(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<User>>;

    async fn find_by_email_in_tenant(&self, email: &str, tenant_id: Uuid) -> Result<Option<User>>;

    async fn insert(&self, user: &User) -> Result<()>;

    /// Write the same code and expiry to every listed row still active and
    /// matching `email`. All rows or none.
    async fn set_magic_code(
        &self,
        ids: &[Uuid],
        email: &str,
        code: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Clear code fields on the listed rows (single-use enforcement)
    async fn clear_magic_code(&self, ids: &[Uuid]) -> Result<()>;

    /// Conditional finalize: if the row still carries exactly `code`, is
    /// active and not archived, clear the code fields and stamp the login
    /// in one step. Returns the updated row, or None when the row is stale.
    async fn record_login(
        &self,
        user_id: Uuid,
        code: &str,
        last_organization_id: Option<Uuid>,
        last_team_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    async fn set_last_login(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Stamp the organization a session last validly operated in
    async fn record_last_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn set_refresh_token_hash(&self, user_id: Uuid, hash: &str) -> Result<()>;

    async fn update_password(&self, user_id: Uuid, hash: &str) -> Result<()>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Employee>>;

    async fn insert(&self, employee: &Employee) -> Result<()>;
}

#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn has_active_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool>;

    async fn add_member(&self, membership: &OrganizationMembership) -> Result<()>;
}

#[async_trait]
pub trait TeamDirectory: Send + Sync {
    /// Teams visible to the user in the tenant: the team's organization is
    /// one the user actively belongs to, and the team has at least one
    /// member satisfying the same constraint. When `employee_id` is given
    /// the membership check narrows to that employee. Rows carry a member
    /// count and come back newest-created first.
    async fn teams_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<TeamSummary>>;

    async fn add_team_member(&self, member: &TeamMember) -> Result<()>;
}

#[async_trait]
pub trait InviteDirectory: Send + Sync {
    /// Open invite (INVITED and unexpired) matching email and stored token
    async fn find_open_by_email_and_token(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>>;

    /// Open invite (INVITED and unexpired) matching email and raw code
    async fn find_open_by_email_and_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>>;

    async fn mark_accepted(&self, invite_id: Uuid, user_id: Uuid) -> Result<()>;

    async fn mark_rejected(&self, invite_id: Uuid) -> Result<()>;

    async fn insert(&self, invite: &Invite) -> Result<()>;
}

#[async_trait]
pub trait SocialAccountDirectory: Send + Sync {
    /// All link rows for an external identity. One provider account may be
    /// linked to identity rows in several tenants.
    async fn find_by_provider(
        &self,
        provider: SocialProvider,
        provider_account_id: &str,
    ) -> Result<Vec<SocialAccount>>;

    /// No uniqueness guard on (user, provider): duplicate links are
    /// currently permitted, matching upstream semantics.
    async fn insert(&self, account: &SocialAccount) -> Result<()>;
}

#[async_trait]
pub trait PasswordResetDirectory: Send + Sync {
    async fn insert(&self, record: &PasswordResetRecord) -> Result<()>;

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordResetRecord>>;
}

/// Role-to-permission resolution, snapshotted into access tokens at
/// issuance time.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Enabled permission strings for the role within the tenant
    async fn enabled_permissions(&self, tenant_id: Uuid, role: Role) -> Result<Vec<String>>;
}
