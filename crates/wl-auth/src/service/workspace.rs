//! Workspace Service
//!
//! One email may resolve to identity rows in several tenants, so login is
//! a two-step exchange: a credential resolves to a *set* of workspaces,
//! each carrying a short-lived workspace token, and a follow-up finalize
//! call trades the chosen token for the access/refresh pair.

use chrono::Utc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::directory::{EmployeeDirectory, RoleDirectory, TeamDirectory, UserDirectory};
use crate::domain::{PublicUser, Role, TeamSummary, User};
use crate::error::{AuthError, Result};
use crate::notifier::Notifier;
use crate::service::magic_code::MagicCodeService;
use crate::service::password::PasswordService;
use crate::service::token::{hash_refresh_token, TokenService};

/// One resolved `(identity, tenant)` pairing offered for selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDescriptor {
    pub user: PublicUser,
    /// Workspace token for the one-time finalize call
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_teams: Option<Vec<TeamSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceListing {
    pub workspaces: Vec<WorkspaceDescriptor>,
    pub confirmed_email: String,
    pub show_selection_popup: bool,
    pub total_workspaces: usize,
}

/// Final authentication result, shared by finalize, direct login, and
/// invite acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    pub token: String,
    pub refresh_token: String,
}

pub struct WorkspaceService {
    users: Arc<dyn UserDirectory>,
    employees: Arc<dyn EmployeeDirectory>,
    teams: Arc<dyn TeamDirectory>,
    roles: Arc<dyn RoleDirectory>,
    tokens: Arc<TokenService>,
    passwords: Arc<PasswordService>,
    magic: Arc<MagicCodeService>,
}

impl WorkspaceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        employees: Arc<dyn EmployeeDirectory>,
        teams: Arc<dyn TeamDirectory>,
        roles: Arc<dyn RoleDirectory>,
        tokens: Arc<TokenService>,
        passwords: Arc<PasswordService>,
        magic: Arc<MagicCodeService>,
    ) -> Self {
        Self {
            users,
            employees,
            teams,
            roles,
            tokens,
            passwords,
            magic,
        }
    }

    /// Resolve a password credential to the set of workspaces it unlocks
    pub async fn signin_by_password(
        &self,
        email: &str,
        password: &str,
        include_teams: bool,
    ) -> Result<WorkspaceListing> {
        let rows = self.users.find_active_by_email(email).await?;
        let survivors: Vec<User> = rows
            .into_iter()
            .filter(|u| self.passwords.verify(u.hash.as_deref(), password))
            .collect();

        if survivors.is_empty() {
            warn!(email = %email, "password signin matched no workspace");
            return Err(AuthError::Authentication);
        }

        let survivors = dedupe_by_tenant(survivors);
        let ids: Vec<Uuid> = survivors.iter().map(|u| u.id).collect();
        let (code, _) = self.magic.issue_for_rows(&ids, email).await?;

        let listing = self.build_listing(&survivors, email, &code, include_teams).await?;
        if listing.total_workspaces == 0 {
            return Err(AuthError::Authentication);
        }
        Ok(listing)
    }

    /// Resolve a previously issued magic code to its workspace set.
    /// No password re-check; no new code is issued.
    pub async fn signin_by_code(
        &self,
        email: &str,
        code: &str,
        include_teams: bool,
    ) -> Result<WorkspaceListing> {
        if email.is_empty() || code.is_empty() {
            return Err(AuthError::Authentication);
        }

        let rows = self.users.find_for_code_signin(email, code, Utc::now()).await?;
        let rows = dedupe_by_tenant(rows);

        let listing = self.build_listing(&rows, email, code, include_teams).await?;
        if listing.total_workspaces == 0 {
            warn!(email = %email, "code signin matched no workspace");
            return Err(AuthError::Authentication);
        }
        Ok(listing)
    }

    /// Trade a workspace token for the access/refresh pair. The token's
    /// `{userId, tenantId, email, code}` must all match a live row; the
    /// code fields are cleared and login stamps written in one step.
    pub async fn finalize_workspace(
        &self,
        email: &str,
        workspace_token: &str,
        last_organization_id: Option<Uuid>,
        last_team_id: Option<Uuid>,
    ) -> Result<AuthResult> {
        if email.is_empty() || workspace_token.is_empty() {
            return Err(AuthError::Authentication);
        }

        // Expiry stays distinguishable; any other token defect collapses
        let claims = self
            .tokens
            .verify_workspace(workspace_token)
            .map_err(AuthError::into_authentication)?;

        if claims.email != email {
            return Err(AuthError::Authentication);
        }

        let now = Utc::now();
        let user = self
            .users
            .find_by_id_in_tenant(claims.user_id, claims.tenant_id)
            .await?
            .ok_or(AuthError::Authentication)?;

        if user.email != email || !user.is_login_eligible() || !user.has_valid_code(&claims.code, now)
        {
            return Err(AuthError::Authentication);
        }

        let user = self
            .users
            .record_login(user.id, &claims.code, last_organization_id, last_team_id, now)
            .await?
            .ok_or(AuthError::Authentication)?;

        self.issue_auth_for(&user).await
    }

    /// Direct single-identity login: the newest active row with a password
    /// hash must match. Every failure collapses to the generic
    /// authentication error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult> {
        let result = self.try_login(email, password).await;
        result.map_err(|e| {
            warn!(email = %email, error = %e, "login failed");
            AuthError::Authentication
        })
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<AuthResult> {
        let rows = self.users.find_active_by_email(email).await?;
        let user = rows
            .into_iter()
            .find(|u| u.hash.is_some())
            .ok_or(AuthError::Authentication)?;

        if !self.passwords.verify(user.hash.as_deref(), password) {
            return Err(AuthError::Authentication);
        }

        self.issue_auth_for(&user).await
    }

    /// Explicit re-issuance path for the stale-permission contract: verify
    /// the refresh token against the stored hash and mint a fresh access
    /// token with a fresh permission snapshot.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let claims = self.tokens.verify_refresh(refresh_token)?;

        let user = self
            .users
            .find_by_id(claims.id)
            .await?
            .filter(|u| u.is_login_eligible() && u.tenant_id == claims.tenant_id)
            .ok_or(AuthError::Authentication)?;

        let stored = user.refresh_token_hash.as_deref().ok_or(AuthError::Authentication)?;
        let presented = hash_refresh_token(refresh_token);
        let matches: bool = stored.as_bytes().ct_eq(presented.as_bytes()).into();
        if !matches {
            return Err(AuthError::Authentication);
        }

        let employee = self.employees.find_by_user_id(user.id).await?;
        let permissions = self.roles.enabled_permissions(user.tenant_id, user.role).await?;
        self.tokens
            .issue_access(&user, employee.map(|e| e.id), permissions)
    }

    /// Issue the access/refresh pair for a resolved identity, persist the
    /// refresh-token hash, and stamp the login. Shared with invite
    /// acceptance, which must produce an identical result shape.
    pub(crate) async fn issue_auth_for(&self, user: &User) -> Result<AuthResult> {
        let employee = self.employees.find_by_user_id(user.id).await?;
        if let Some(employee) = &employee {
            if !employee.is_working() {
                return Err(AuthError::Authentication);
            }
        }
        let employee_id = employee.map(|e| e.id);

        let permissions = self.roles.enabled_permissions(user.tenant_id, user.role).await?;
        let token = self.tokens.issue_access(user, employee_id, permissions)?;
        let refresh_token = self.tokens.issue_refresh(user)?;

        // Both signings done; persist against the final identity id
        self.users
            .set_refresh_token_hash(user.id, &hash_refresh_token(&refresh_token))
            .await?;
        self.users.set_last_login(user.id, Utc::now()).await?;

        Ok(AuthResult {
            user: PublicUser::from(user),
            employee_id,
            token,
            refresh_token,
        })
    }

    /// Build the listing: one descriptor per surviving row, each with its
    /// own workspace token. Team enrichment is best-effort; a failure is
    /// logged and the field omitted, never aborting the response.
    pub(crate) async fn build_listing(
        &self,
        users: &[User],
        email: &str,
        code: &str,
        include_teams: bool,
    ) -> Result<WorkspaceListing> {
        let mut workspaces = Vec::with_capacity(users.len());

        for user in users {
            let token = self.tokens.issue_workspace_token(user, code)?;
            let current_teams = if include_teams {
                match self.teams_for(user).await {
                    Ok(teams) => Some(teams),
                    Err(e) => {
                        warn!(user_id = %user.id, tenant_id = %user.tenant_id, error = %e,
                              "team enrichment failed, omitting teams");
                        None
                    }
                }
            } else {
                None
            };

            workspaces.push(WorkspaceDescriptor {
                user: PublicUser::from(user),
                token,
                current_teams,
            });
        }

        let total_workspaces = workspaces.len();
        Ok(WorkspaceListing {
            workspaces,
            confirmed_email: email.to_string(),
            show_selection_popup: total_workspaces > 1,
            total_workspaces,
        })
    }

    async fn teams_for(&self, user: &User) -> Result<Vec<TeamSummary>> {
        // Admins see every eligible team; others only teams they sit on
        let employee_id = if matches!(user.role, Role::SuperAdmin | Role::Admin) {
            None
        } else {
            self.employees.find_by_user_id(user.id).await?.map(|e| e.id)
        };
        self.teams
            .teams_for_user(user.tenant_id, user.id, employee_id)
            .await
    }

    /// Outbound passwordless entry point, delegated to the code service
    pub async fn send_signin_code(&self, email: &str, locale: &str) {
        self.magic.send_magic_code(email, locale).await;
    }
}

/// Defensive tie-break: if several active rows share `(email, tenant)`,
/// the newest-created row wins. Input is ordered newest first. Every
/// listing path applies this before issuing codes or tokens.
pub(crate) fn dedupe_by_tenant(users: Vec<User>) -> Vec<User> {
    let mut seen: Vec<Uuid> = Vec::new();
    users
        .into_iter()
        .filter(|u| {
            if seen.contains(&u.tenant_id) {
                false
            } else {
                seen.push(u.tenant_id);
                true
            }
        })
        .collect()
}

/// Convenience constructor wiring every dependency from one directory
/// implementation, used by embedded setups and tests.
pub fn build_workspace_service(
    config: crate::config::AuthConfig,
    directory: Arc<crate::directory::InMemoryDirectory>,
    notifier: Arc<dyn Notifier>,
) -> WorkspaceService {
    let tokens = Arc::new(TokenService::new(&config));
    let passwords = Arc::new(PasswordService::new(&config));
    let magic = Arc::new(MagicCodeService::new(
        config,
        directory.clone(),
        notifier,
    ));
    WorkspaceService::new(
        directory.clone(),
        directory.clone(),
        directory.clone(),
        directory,
        tokens,
        passwords,
        magic,
    )
}
