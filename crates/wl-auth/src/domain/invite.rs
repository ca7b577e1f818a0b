//! Invite Entity
//!
//! An invite is a pending offer for an email to join a tenant under a
//! given role. Status transitions are one-way (INVITED -> ACCEPTED or
//! REJECTED). Expiry is derived at read time, never written as a status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Role, TenantInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Invited,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant: TenantInfo,
    pub organization_id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Signed token carrying `{email, code}`
    #[serde(skip_serializing)]
    pub token: String,
    /// Raw short code, usable instead of the token
    #[serde(skip_serializing)]
    pub code: String,

    pub role: Role,
    pub status: InviteStatus,
    /// None means the invite never expires
    pub expire_at: Option<DateTime<Utc>>,

    pub invited_by: Option<Uuid>,
    /// Identity that answered the invite, set on accept
    pub user_id: Option<Uuid>,
    pub team_ids: Vec<Uuid>,
    pub project_ids: Vec<Uuid>,
    pub department_ids: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn new(
        tenant: TenantInfo,
        organization_id: Uuid,
        email: impl Into<String>,
        role: Role,
        token: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            tenant,
            organization_id,
            email: email.into(),
            full_name: None,
            token: token.into(),
            code: code.into(),
            role,
            status: InviteStatus::Invited,
            expire_at: None,
            invited_by: None,
            user_id: None,
            team_ids: Vec::new(),
            project_ids: Vec::new(),
            department_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_expiry(mut self, expire_at: DateTime<Utc>) -> Self {
        self.expire_at = Some(expire_at);
        self
    }

    pub fn with_teams(mut self, team_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.team_ids = team_ids.into_iter().collect();
        self
    }

    /// The single expiry predicate shared by every lookup path:
    /// `expire_at IS NULL OR expire_at >= now`.
    pub fn is_unexpired(&self, now: DateTime<Utc>) -> bool {
        match self.expire_at {
            None => true,
            Some(expire_at) => expire_at >= now,
        }
    }

    /// Still answerable: INVITED and unexpired
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == InviteStatus::Invited && self.is_unexpired(now)
    }

    /// Split the invite's full name into (first, last) for provisioning
    pub fn split_name(&self) -> (String, String) {
        let mut parts = self
            .full_name
            .as_deref()
            .unwrap_or_default()
            .split_whitespace();
        let first = parts.next().unwrap_or_default().to_string();
        let last = parts.next().unwrap_or_default().to_string();
        (first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite() -> Invite {
        let tenant = TenantInfo {
            id: Uuid::new_v4(),
            name: "T".to_string(),
            logo: None,
        };
        Invite::new(tenant, Uuid::new_v4(), "new@x.com", Role::Employee, "tok", "CODE42")
    }

    #[test]
    fn test_null_expiry_never_expires() {
        let invite = invite();
        assert!(invite.is_open(Utc::now() + Duration::days(365 * 10)));
    }

    #[test]
    fn test_past_expiry_closes_invite() {
        let invite = invite().with_expiry(Utc::now() - Duration::hours(1));
        assert!(!invite.is_open(Utc::now()));
    }

    #[test]
    fn test_answered_invite_not_open() {
        let mut invite = invite();
        invite.status = InviteStatus::Accepted;
        assert!(!invite.is_open(Utc::now()));
    }

    #[test]
    fn test_split_name() {
        let invite = invite().with_full_name("Ada Lovelace");
        assert_eq!(invite.split_name(), ("Ada".to_string(), "Lovelace".to_string()));

        let single = Invite {
            full_name: Some("Ada".to_string()),
            ..self::invite()
        };
        assert_eq!(single.split_name(), ("Ada".to_string(), String::new()));
    }
}
