//! Team Entities
//!
//! Teams live inside an organization; membership is by employee record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(tenant_id: Uuid, organization_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            organization_id,
            name: name.into(),
            logo: None,
            profile_link: None,
            prefix: None,
            is_active: true,
            is_archived: false,
            created_at: Utc::now(),
        }
    }
}

/// Assignment of an employee to a team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub employee_id: Uuid,
    pub organization_id: Uuid,
    pub tenant_id: Uuid,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn new(team_id: Uuid, employee_id: Uuid, organization_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            employee_id,
            organization_id,
            tenant_id,
            is_active: true,
            is_archived: false,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated team row returned by the workspace team-enrichment query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub team_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_logo: Option<String>,
    pub team_member_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}
