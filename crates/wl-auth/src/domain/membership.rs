//! Organization Membership Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a user identity to an organization within its tenant.
/// Required for any organization-scoped claim to be valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub tenant_id: Uuid,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl OrganizationMembership {
    pub fn new(user_id: Uuid, organization_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            tenant_id,
            is_active: true,
            is_archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_current(&self) -> bool {
        self.is_active && !self.is_archived
    }
}
