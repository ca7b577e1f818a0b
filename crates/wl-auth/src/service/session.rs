//! Session Authorizer
//!
//! Re-validates the identity behind already-verified token claims on each
//! request. Token signature checking happens at the edge; this layer
//! answers whether the rows the claims point at are still live. Every
//! failure collapses to the same authorization error.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::directory::{EmployeeDirectory, MembershipDirectory, UserDirectory};
use crate::domain::{Employee, User};
use crate::error::{AuthError, Result};

/// Identity assertions extracted from a verified access token plus any
/// organization scope the request claims
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,
    pub tenant_id: Uuid,
}

/// Fully validated request identity
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    pub employee: Option<Employee>,
    /// Organization the request validly operates in, when claimed
    pub organization_id: Option<Uuid>,
}

pub struct SessionService {
    users: Arc<dyn UserDirectory>,
    employees: Arc<dyn EmployeeDirectory>,
    memberships: Arc<dyn MembershipDirectory>,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        employees: Arc<dyn EmployeeDirectory>,
        memberships: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            users,
            employees,
            memberships,
        }
    }

    /// Validate the claims against live rows. The user must exist (by id,
    /// or by third-party id for federated sessions), be active in the
    /// claimed tenant; a claimed employee record must be working; a
    /// claimed organization must hold an active membership and, when an
    /// employee is claimed, be the employee's own organization. On success the
    /// validated organization is stamped as the identity's last one.
    ///
    /// Every failure, including an unexpected directory error, collapses
    /// to the authorization error; nothing internal crosses this boundary.
    pub async fn authorize(&self, claims: &SessionClaims) -> Result<SessionContext> {
        self.try_authorize(claims).await.map_err(|e| {
            warn!(tenant_id = %claims.tenant_id, error = %e, "session authorization failed");
            AuthError::Authorization
        })
    }

    async fn try_authorize(&self, claims: &SessionClaims) -> Result<SessionContext> {
        let user = self.resolve_user(claims).await?;
        if !user.is_login_eligible() || user.tenant_id != claims.tenant_id {
            return Err(AuthError::Authorization);
        }

        let employee = match claims.employee_id {
            Some(employee_id) => {
                let employee = self
                    .employees
                    .find_by_user_id(user.id)
                    .await?
                    .filter(|e| e.id == employee_id && e.is_working())
                    .ok_or(AuthError::Authorization)?;
                Some(employee)
            }
            None => None,
        };

        let organization_id = match claims.organization_id {
            Some(organization_id) => {
                if let Some(employee) = &employee {
                    if employee.organization_id != organization_id {
                        return Err(AuthError::Authorization);
                    }
                }
                let member = self
                    .memberships
                    .has_active_membership(user.id, organization_id, user.tenant_id)
                    .await?;
                if !member {
                    return Err(AuthError::Authorization);
                }
                if user.last_organization_id != Some(organization_id) {
                    self.users
                        .record_last_organization(user.id, organization_id, Utc::now())
                        .await?;
                }
                Some(organization_id)
            }
            None => None,
        };

        Ok(SessionContext {
            user,
            employee,
            organization_id,
        })
    }

    async fn resolve_user(&self, claims: &SessionClaims) -> Result<User> {
        if let Some(id) = claims.id {
            return self
                .users
                .find_by_id(id)
                .await?
                .ok_or(AuthError::Authorization);
        }
        if let Some(third_party_id) = claims.third_party_id.as_deref() {
            return self
                .users
                .find_by_third_party_id(third_party_id)
                .await?
                .ok_or(AuthError::Authorization);
        }
        Err(AuthError::Authorization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::domain::{OrganizationMembership, Role, TenantInfo};
    use async_trait::async_trait;

    /// Membership lookups fail as if the backend were down
    struct BrokenMemberships;

    #[async_trait]
    impl MembershipDirectory for BrokenMemberships {
        async fn has_active_membership(
            &self,
            _user_id: Uuid,
            _organization_id: Uuid,
            _tenant_id: Uuid,
        ) -> Result<bool> {
            Err(AuthError::internal("backend unavailable"))
        }

        async fn add_member(&self, _membership: &OrganizationMembership) -> Result<()> {
            Err(AuthError::internal("backend unavailable"))
        }
    }

    fn tenant() -> TenantInfo {
        TenantInfo {
            id: Uuid::new_v4(),
            name: "T".to_string(),
            logo: None,
        }
    }

    fn harness() -> (Arc<InMemoryDirectory>, SessionService) {
        let dir = Arc::new(InMemoryDirectory::new());
        let service = SessionService::new(dir.clone(), dir.clone(), dir.clone());
        (dir, service)
    }

    fn claims_for(user: &User) -> SessionClaims {
        SessionClaims {
            id: Some(user.id),
            third_party_id: None,
            employee_id: None,
            organization_id: None,
            tenant_id: user.tenant_id,
        }
    }

    #[tokio::test]
    async fn test_live_user_authorizes() {
        let (dir, service) = harness();
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let claims = claims_for(&user);
        dir.add_user(user);

        let ctx = service.authorize(&claims).await.unwrap();
        assert!(ctx.employee.is_none());
    }

    #[tokio::test]
    async fn test_archived_user_is_rejected() {
        let (dir, service) = harness();
        let mut user = User::new(tenant(), "a@x.com", Role::Employee);
        user.is_archived = true;
        let claims = claims_for(&user);
        dir.add_user(user);

        assert!(matches!(
            service.authorize(&claims).await,
            Err(AuthError::Authorization)
        ));
    }

    #[tokio::test]
    async fn test_tenant_mismatch_is_rejected() {
        let (dir, service) = harness();
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let mut claims = claims_for(&user);
        claims.tenant_id = Uuid::new_v4();
        dir.add_user(user);

        assert!(matches!(
            service.authorize(&claims).await,
            Err(AuthError::Authorization)
        ));
    }

    #[tokio::test]
    async fn test_archived_employee_blocks_employee_claims() {
        let (dir, service) = harness();
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let mut employee = Employee::new(user.id, user.tenant_id, Uuid::new_v4());
        employee.is_archived = true;
        let mut claims = claims_for(&user);
        claims.employee_id = Some(employee.id);
        dir.add_user(user);
        dir.add_employee(employee);

        assert!(matches!(
            service.authorize(&claims).await,
            Err(AuthError::Authorization)
        ));
    }

    #[tokio::test]
    async fn test_internal_failure_collapses_to_authorization() {
        let dir = Arc::new(InMemoryDirectory::new());
        let service = SessionService::new(dir.clone(), dir.clone(), Arc::new(BrokenMemberships));
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let mut claims = claims_for(&user);
        claims.organization_id = Some(Uuid::new_v4());
        dir.add_user(user);

        // The raw internal error must never cross the boundary
        assert!(matches!(
            service.authorize(&claims).await,
            Err(AuthError::Authorization)
        ));
    }

    #[tokio::test]
    async fn test_employee_org_must_match_claimed_org() {
        let (dir, service) = harness();
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let employee = Employee::new(user.id, user.tenant_id, Uuid::new_v4());
        let other_org = Uuid::new_v4();
        let mut claims = claims_for(&user);
        claims.employee_id = Some(employee.id);
        claims.organization_id = Some(other_org);
        dir.add_membership(OrganizationMembership::new(user.id, other_org, user.tenant_id));
        dir.add_user(user);
        dir.add_employee(employee);

        assert!(matches!(
            service.authorize(&claims).await,
            Err(AuthError::Authorization)
        ));
    }

    #[tokio::test]
    async fn test_membership_gates_organization_scope() {
        let (dir, service) = harness();
        let user = User::new(tenant(), "a@x.com", Role::Employee);
        let organization_id = Uuid::new_v4();
        let mut claims = claims_for(&user);
        claims.organization_id = Some(organization_id);
        let user_id = user.id;
        let tenant_id = user.tenant_id;
        dir.add_user(user);

        assert!(service.authorize(&claims).await.is_err());

        dir.add_membership(OrganizationMembership::new(user_id, organization_id, tenant_id));
        let ctx = service.authorize(&claims).await.unwrap();
        assert_eq!(ctx.organization_id, Some(organization_id));
        assert_eq!(
            dir.get_user(user_id).unwrap().last_organization_id,
            Some(organization_id)
        );
    }
}
