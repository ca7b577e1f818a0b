//! In-Memory Directory
//!
//! A single store implementing every directory trait, used by tests and
//! embedded deployments. All mutations take one write lock, so batch
//! updates are applied all-or-nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    Employee, Invite, InviteStatus, OrganizationMembership, PasswordResetRecord, Role,
    SocialAccount, SocialProvider, Team, TeamMember, TeamSummary, User,
};
use crate::error::Result;

use super::{
    EmployeeDirectory, InviteDirectory, MembershipDirectory, PasswordResetDirectory,
    RoleDirectory, SocialAccountDirectory, TeamDirectory, UserDirectory,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    employees: HashMap<Uuid, Employee>,
    memberships: Vec<OrganizationMembership>,
    teams: HashMap<Uuid, Team>,
    team_members: Vec<TeamMember>,
    invites: HashMap<Uuid, Invite>,
    social_accounts: Vec<SocialAccount>,
    password_resets: Vec<PasswordResetRecord>,
    role_permissions: HashMap<(Uuid, Role), Vec<String>>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.state.write().users.insert(user.id, user);
    }

    pub fn add_employee(&self, employee: Employee) {
        self.state.write().employees.insert(employee.id, employee);
    }

    pub fn add_membership(&self, membership: OrganizationMembership) {
        self.state.write().memberships.push(membership);
    }

    pub fn add_team(&self, team: Team) {
        self.state.write().teams.insert(team.id, team);
    }

    pub fn add_team_member(&self, member: TeamMember) {
        self.state.write().team_members.push(member);
    }

    pub fn add_invite(&self, invite: Invite) {
        self.state.write().invites.insert(invite.id, invite);
    }

    pub fn add_social_account(&self, account: SocialAccount) {
        self.state.write().social_accounts.push(account);
    }

    /// Override the enabled permission set for a role within a tenant
    pub fn set_role_permissions(
        &self,
        tenant_id: Uuid,
        role: Role,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.state.write().role_permissions.insert(
            (tenant_id, role),
            permissions.into_iter().map(Into::into).collect(),
        );
    }

    pub fn get_user(&self, id: Uuid) -> Option<User> {
        self.state.read().users.get(&id).cloned()
    }

    pub fn get_invite(&self, id: Uuid) -> Option<Invite> {
        self.state.read().invites.get(&id).cloned()
    }

    pub fn social_accounts_for_user(&self, user_id: Uuid) -> Vec<SocialAccount> {
        self.state
            .read()
            .social_accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn password_resets_for_email(&self, email: &str) -> Vec<PasswordResetRecord> {
        self.state
            .read()
            .password_resets
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect()
    }

    pub fn team_members_for_team(&self, team_id: Uuid) -> Vec<TeamMember> {
        self.state
            .read()
            .team_members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect()
    }

    /// Organizations the user actively belongs to within the tenant
    fn active_organizations(state: &State, user_id: Uuid, tenant_id: Uuid) -> Vec<Uuid> {
        state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.tenant_id == tenant_id && m.is_current())
            .map(|m| m.organization_id)
            .collect()
    }

    fn newest_first(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }
}

/// Baseline permission sets when no tenant override is present
fn default_permissions(role: Role) -> Vec<String> {
    let perms: &[&str] = match role {
        Role::SuperAdmin | Role::Admin => &[
            "org:read",
            "org:write",
            "team:read",
            "team:write",
            "member:invite",
            "member:read",
        ],
        Role::Manager => &["org:read", "team:read", "team:write", "member:read"],
        Role::Employee => &["org:read", "team:read"],
        Role::Candidate | Role::Viewer => &["org:read"],
    };
    perms.iter().map(|p| p.to_string()).collect()
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_active_by_email(&self, email: &str) -> Result<Vec<User>> {
        let state = self.state.read();
        let users = state
            .users
            .values()
            .filter(|u| u.email == email && u.is_login_eligible())
            .cloned()
            .collect();
        Ok(Self::newest_first(users))
    }

    async fn find_for_code_signin(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>> {
        let state = self.state.read();
        let users = state
            .users
            .values()
            .filter(|u| u.email == email && u.is_login_eligible() && u.has_valid_code(code, now))
            .cloned()
            .collect();
        Ok(Self::newest_first(users))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_by_third_party_id(&self, third_party_id: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.third_party_id.as_deref() == Some(third_party_id))
            .cloned())
    }

    async fn find_by_id_in_tenant(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .get(&id)
            .filter(|u| u.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_email_in_tenant(&self, email: &str, tenant_id: Uuid) -> Result<Option<User>> {
        let state = self.state.read();
        let matches: Vec<User> = state
            .users
            .values()
            .filter(|u| u.email == email && u.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matches).into_iter().next())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        self.state.write().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_magic_code(
        &self,
        ids: &[Uuid],
        email: &str,
        code: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write();
        for id in ids {
            if let Some(user) = state.users.get_mut(id) {
                if user.email == email && user.is_login_eligible() {
                    user.code = Some(code.to_string());
                    user.code_expire_at = Some(expire_at);
                }
            }
        }
        Ok(())
    }

    async fn clear_magic_code(&self, ids: &[Uuid]) -> Result<()> {
        let mut state = self.state.write();
        for id in ids {
            if let Some(user) = state.users.get_mut(id) {
                user.code = None;
                user.code_expire_at = None;
            }
        }
        Ok(())
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        code: &str,
        last_organization_id: Option<Uuid>,
        last_team_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut state = self.state.write();
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if !user.is_login_eligible() || user.code.as_deref() != Some(code) {
            return Ok(None);
        }

        user.code = None;
        user.code_expire_at = None;
        user.last_login_at = Some(now);
        user.last_organization_id = last_organization_id.or(user.last_organization_id);
        user.last_team_id = last_team_id;
        Ok(Some(user.clone()))
    }

    async fn set_last_login(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.last_login_at = Some(now);
        }
        Ok(())
    }

    async fn record_last_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.last_organization_id = Some(organization_id);
            user.last_login_at = Some(now);
        }
        Ok(())
    }

    async fn set_refresh_token_hash(&self, user_id: Uuid, hash: &str) -> Result<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.refresh_token_hash = Some(hash.to_string());
        }
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, hash: &str) -> Result<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.hash = Some(hash.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Employee>> {
        Ok(self
            .state
            .read()
            .employees
            .values()
            .find(|e| e.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, employee: &Employee) -> Result<()> {
        self.state.write().employees.insert(employee.id, employee.clone());
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryDirectory {
    async fn has_active_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool> {
        Ok(self.state.read().memberships.iter().any(|m| {
            m.user_id == user_id
                && m.organization_id == organization_id
                && m.tenant_id == tenant_id
                && m.is_current()
        }))
    }

    async fn add_member(&self, membership: &OrganizationMembership) -> Result<()> {
        self.state.write().memberships.push(membership.clone());
        Ok(())
    }
}

#[async_trait]
impl TeamDirectory for InMemoryDirectory {
    async fn teams_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<TeamSummary>> {
        let state = self.state.read();
        let orgs = Self::active_organizations(&state, user_id, tenant_id);

        let mut summaries: Vec<(DateTime<Utc>, TeamSummary)> = Vec::new();

        for team in state.teams.values() {
            if team.tenant_id != tenant_id
                || !team.is_active
                || team.is_archived
                || !orgs.contains(&team.organization_id)
            {
                continue;
            }

            let members: Vec<&TeamMember> = state
                .team_members
                .iter()
                .filter(|m| {
                    m.team_id == team.id
                        && m.tenant_id == tenant_id
                        && m.is_active
                        && !m.is_archived
                        && orgs.contains(&m.organization_id)
                })
                .collect();

            let eligible = match employee_id {
                Some(employee_id) => members.iter().any(|m| m.employee_id == employee_id),
                None => !members.is_empty(),
            };
            if !eligible {
                continue;
            }

            summaries.push((
                team.created_at,
                TeamSummary {
                    team_id: team.id,
                    team_name: team.name.clone(),
                    team_logo: team.logo.clone(),
                    team_member_count: members.len() as u64,
                    profile_link: team.profile_link.clone(),
                    prefix: team.prefix.clone(),
                },
            ));
        }

        summaries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(summaries.into_iter().map(|(_, s)| s).collect())
    }

    async fn add_team_member(&self, member: &TeamMember) -> Result<()> {
        self.state.write().team_members.push(member.clone());
        Ok(())
    }
}

#[async_trait]
impl InviteDirectory for InMemoryDirectory {
    async fn find_open_by_email_and_token(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>> {
        Ok(self
            .state
            .read()
            .invites
            .values()
            .find(|i| i.email == email && i.token == token && i.is_open(now))
            .cloned())
    }

    async fn find_open_by_email_and_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>> {
        Ok(self
            .state
            .read()
            .invites
            .values()
            .find(|i| i.email == email && i.code == code && i.is_open(now))
            .cloned())
    }

    async fn mark_accepted(&self, invite_id: Uuid, user_id: Uuid) -> Result<()> {
        if let Some(invite) = self.state.write().invites.get_mut(&invite_id) {
            invite.status = InviteStatus::Accepted;
            invite.user_id = Some(user_id);
        }
        Ok(())
    }

    async fn mark_rejected(&self, invite_id: Uuid) -> Result<()> {
        if let Some(invite) = self.state.write().invites.get_mut(&invite_id) {
            invite.status = InviteStatus::Rejected;
        }
        Ok(())
    }

    async fn insert(&self, invite: &Invite) -> Result<()> {
        self.state.write().invites.insert(invite.id, invite.clone());
        Ok(())
    }
}

#[async_trait]
impl SocialAccountDirectory for InMemoryDirectory {
    async fn find_by_provider(
        &self,
        provider: SocialProvider,
        provider_account_id: &str,
    ) -> Result<Vec<SocialAccount>> {
        Ok(self
            .state
            .read()
            .social_accounts
            .iter()
            .filter(|a| a.provider == provider && a.provider_account_id == provider_account_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, account: &SocialAccount) -> Result<()> {
        self.state.write().social_accounts.push(account.clone());
        Ok(())
    }
}

#[async_trait]
impl PasswordResetDirectory for InMemoryDirectory {
    async fn insert(&self, record: &PasswordResetRecord) -> Result<()> {
        self.state.write().password_resets.push(record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PasswordResetRecord>> {
        Ok(self
            .state
            .read()
            .password_resets
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }
}

#[async_trait]
impl RoleDirectory for InMemoryDirectory {
    async fn enabled_permissions(&self, tenant_id: Uuid, role: Role) -> Result<Vec<String>> {
        let state = self.state.read();
        Ok(state
            .role_permissions
            .get(&(tenant_id, role))
            .cloned()
            .unwrap_or_else(|| default_permissions(role)))
    }
}
