//! Employee Entity
//!
//! One-to-one with a user identity inside one organization. Flags are
//! independent of the user's own flags: an active user may have an
//! archived employee record, which blocks organization-scoped claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub started_work_on: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(user_id: Uuid, tenant_id: Uuid, organization_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            organization_id,
            started_work_on: Some(now),
            is_active: true,
            is_archived: false,
            created_at: now,
        }
    }

    pub fn is_working(&self) -> bool {
        self.is_active && !self.is_archived
    }
}
