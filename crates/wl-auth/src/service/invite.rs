//! Invite Acceptance Engine
//!
//! Invites carry two interchangeable credentials, a signed token and a raw
//! short code, both validated against the same open-invite predicate:
//! status INVITED and `expire_at IS NULL OR expire_at >= now`. Expiry is
//! derived at read time; nothing ever writes an EXPIRED status. Every
//! validation defect collapses to the same invalid-invite error so a
//! caller cannot probe which field was wrong.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::directory::{
    EmployeeDirectory, InviteDirectory, MembershipDirectory, TeamDirectory, UserDirectory,
};
use crate::domain::{
    Employee, Invite, OrganizationMembership, Role, TeamMember, TenantInfo, User,
};
use crate::error::{AuthError, Result};
use crate::notifier::Notifier;
use crate::service::magic_code::generate_code;
use crate::service::password::PasswordService;
use crate::service::token::TokenService;
use crate::service::workspace::{AuthResult, WorkspaceService};

/// Either credential form an invite can be answered with
#[derive(Debug, Clone)]
pub enum InviteCredential {
    Token(String),
    Code(String),
}

/// Everything an accept call may carry. Password and name are only used
/// when the invite provisions a brand-new identity.
#[derive(Debug, Clone)]
pub struct AcceptInviteInput {
    pub email: String,
    pub credential: InviteCredential,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: String,
}

pub struct InviteService {
    config: AuthConfig,
    invites: Arc<dyn InviteDirectory>,
    users: Arc<dyn UserDirectory>,
    employees: Arc<dyn EmployeeDirectory>,
    memberships: Arc<dyn MembershipDirectory>,
    teams: Arc<dyn TeamDirectory>,
    tokens: Arc<TokenService>,
    passwords: Arc<PasswordService>,
    workspace: Arc<WorkspaceService>,
    notifier: Arc<dyn Notifier>,
}

impl InviteService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AuthConfig,
        invites: Arc<dyn InviteDirectory>,
        users: Arc<dyn UserDirectory>,
        employees: Arc<dyn EmployeeDirectory>,
        memberships: Arc<dyn MembershipDirectory>,
        teams: Arc<dyn TeamDirectory>,
        tokens: Arc<TokenService>,
        passwords: Arc<PasswordService>,
        workspace: Arc<WorkspaceService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            invites,
            users,
            employees,
            memberships,
            teams,
            tokens,
            passwords,
            workspace,
            notifier,
        }
    }

    /// Create and store a new invite for an email to join a tenant. The
    /// invite gets both credential forms: a raw code and a signed token
    /// embedding `{email, code}`.
    pub async fn create_invite(
        &self,
        tenant: TenantInfo,
        organization_id: Uuid,
        email: &str,
        role: Role,
        invited_by: Option<Uuid>,
        full_name: Option<&str>,
        team_ids: Vec<Uuid>,
        expire_at: Option<chrono::DateTime<Utc>>,
        locale: &str,
    ) -> Result<Invite> {
        if email.is_empty() {
            return Err(AuthError::validation("invite email is required"));
        }

        let code = generate_code();
        let token = self.tokens.issue_invite_token(email, &code)?;

        let mut invite = Invite::new(tenant, organization_id, email, role, token, code)
            .with_teams(team_ids);
        invite.invited_by = invited_by;
        if let Some(full_name) = full_name {
            invite = invite.with_full_name(full_name);
        }
        invite.expire_at = expire_at;

        self.invites.insert(&invite).await?;
        info!(invite_id = %invite.id, email = %email, "invite created");

        let invite_link = format!(
            "{}/#/auth/accept-invite?email={}&token={}",
            self.config.client_base_url, invite.email, invite.token
        );
        if let Err(e) = self
            .notifier
            .send_invite(&invite.email, &invite.tenant.name, &invite_link, locale)
            .await
        {
            warn!(invite_id = %invite.id, error = %e, "invite notification failed");
        }

        Ok(invite)
    }

    /// Resolve a credential to its open invite. Token validation checks
    /// the signature and that the embedded email and code match both the
    /// caller and the stored row.
    pub async fn validate(&self, email: &str, credential: &InviteCredential) -> Result<Invite> {
        let now = Utc::now();
        let invite = match credential {
            InviteCredential::Token(token) => {
                let claims = self
                    .tokens
                    .verify_invite(token)
                    .map_err(|_| AuthError::InvalidInvite)?;
                if claims.email != email {
                    return Err(AuthError::InvalidInvite);
                }
                let invite = self
                    .invites
                    .find_open_by_email_and_token(email, token, now)
                    .await?
                    .ok_or(AuthError::InvalidInvite)?;
                if invite.code != claims.code {
                    return Err(AuthError::InvalidInvite);
                }
                invite
            }
            InviteCredential::Code(code) => self
                .invites
                .find_open_by_email_and_code(email, code, now)
                .await?
                .ok_or(AuthError::InvalidInvite)?,
        };
        Ok(invite)
    }

    /// Answer an invite positively. Resolves or provisions the identity in
    /// the invite's tenant, records the acceptance, and returns the same
    /// auth result shape as a login.
    pub async fn accept(&self, input: AcceptInviteInput) -> Result<AuthResult> {
        let invite = self.validate(&input.email, &input.credential).await?;

        let existing = self
            .users
            .find_by_email_in_tenant(&input.email, invite.tenant_id)
            .await?;

        let user = match existing {
            Some(user) => {
                if !user.is_login_eligible() {
                    warn!(invite_id = %invite.id, "invite answered by ineligible identity");
                    return Err(AuthError::InvalidInvite);
                }
                self.attach_existing(&user, &invite).await?;
                user
            }
            None => self.provision_new(&invite, &input).await?,
        };

        self.invites.mark_accepted(invite.id, user.id).await?;
        info!(invite_id = %invite.id, user_id = %user.id, "invite accepted");

        self.workspace.issue_auth_for(&user).await
    }

    /// Answer an invite negatively. The invite must still be open; the
    /// transition is one-way.
    pub async fn reject(&self, email: &str, credential: &InviteCredential) -> Result<()> {
        let invite = self.validate(email, credential).await?;
        self.invites.mark_rejected(invite.id).await?;
        info!(invite_id = %invite.id, "invite rejected");
        Ok(())
    }

    /// The identity already exists in the invite's tenant: make sure it
    /// holds the organization membership and, for employee invites, an
    /// employee record assigned to the invited teams.
    async fn attach_existing(&self, user: &User, invite: &Invite) -> Result<()> {
        let has_membership = self
            .memberships
            .has_active_membership(user.id, invite.organization_id, invite.tenant_id)
            .await?;
        if !has_membership {
            self.memberships
                .add_member(&OrganizationMembership::new(
                    user.id,
                    invite.organization_id,
                    invite.tenant_id,
                ))
                .await?;
        }

        if invite.role == Role::Employee {
            let employee = match self.employees.find_by_user_id(user.id).await? {
                Some(employee) => employee,
                None => {
                    let employee =
                        Employee::new(user.id, invite.tenant_id, invite.organization_id);
                    self.employees.insert(&employee).await?;
                    employee
                }
            };
            self.assign_teams(&employee, invite).await?;
        }
        Ok(())
    }

    /// No identity in the invite's tenant yet: provision one, with the
    /// password hashed when supplied, membership and employee record as
    /// the role requires, and the email marked verified since the invite
    /// itself proved control of the address.
    async fn provision_new(&self, invite: &Invite, input: &AcceptInviteInput) -> Result<User> {
        let (invite_first, invite_last) = invite.split_name();
        let first = input.first_name.clone().unwrap_or(invite_first);
        let last = input.last_name.clone().unwrap_or(invite_last);

        let mut user = User::new(invite.tenant.clone(), &invite.email, invite.role)
            .with_name(first, last);
        if let Some(password) = input.password.as_deref() {
            user = user.with_hash(self.passwords.hash(password)?);
        }
        let now = Utc::now();
        user.email_verified_at = Some(now);

        self.users.insert(&user).await?;
        self.memberships
            .add_member(&OrganizationMembership::new(
                user.id,
                invite.organization_id,
                invite.tenant_id,
            ))
            .await?;

        if invite.role == Role::Employee {
            let employee = Employee::new(user.id, invite.tenant_id, invite.organization_id);
            self.employees.insert(&employee).await?;
            self.assign_teams(&employee, invite).await?;
        }

        let public = crate::domain::PublicUser::from(&user);
        if let Err(e) = self
            .notifier
            .send_welcome(&public, &input.locale, Some(invite.organization_id), None)
            .await
        {
            warn!(user_id = %user.id, error = %e, "welcome notification failed");
        }

        Ok(user)
    }

    async fn assign_teams(&self, employee: &Employee, invite: &Invite) -> Result<()> {
        for team_id in &invite.team_ids {
            self.teams
                .add_team_member(&TeamMember::new(
                    *team_id,
                    employee.id,
                    invite.organization_id,
                    invite.tenant_id,
                ))
                .await?;
        }
        Ok(())
    }
}
