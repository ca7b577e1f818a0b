//! Password Reset Coordinator
//!
//! The request side is anti-enumeration by construction: it returns the
//! same success shape whether the email matched zero, one, or many
//! identities, with failures logged rather than surfaced. The reset side
//! uses one generic validation error for every defect so a caller cannot
//! learn which check failed.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::directory::{PasswordResetDirectory, UserDirectory};
use crate::domain::{PasswordResetRecord, PublicUser, User};
use crate::error::{AuthError, Result};
use crate::notifier::{Notifier, TenantResetLink};
use crate::service::password::PasswordService;
use crate::service::token::TokenService;

const RESET_FAILED: &str = "password reset failed";

pub struct PasswordResetService {
    config: AuthConfig,
    users: Arc<dyn UserDirectory>,
    resets: Arc<dyn PasswordResetDirectory>,
    tokens: Arc<TokenService>,
    passwords: Arc<PasswordService>,
    notifier: Arc<dyn Notifier>,
}

impl PasswordResetService {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserDirectory>,
        resets: Arc<dyn PasswordResetDirectory>,
        tokens: Arc<TokenService>,
        passwords: Arc<PasswordService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            users,
            resets,
            tokens,
            passwords,
            notifier,
        }
    }

    /// Issue reset tokens for every identity behind the email and notify.
    /// Always returns success; the response never reveals whether the
    /// email exists.
    pub async fn request_reset(&self, email: &str, locale: &str) {
        if let Err(e) = self.try_request_reset(email, locale).await {
            warn!(email = %email, error = %e, "password reset request failed");
        }
    }

    async fn try_request_reset(&self, email: &str, locale: &str) -> Result<()> {
        if email.is_empty() {
            return Ok(());
        }

        let rows = self.users.find_active_by_email(email).await?;
        if rows.is_empty() {
            info!(email = %email, "password reset requested for unknown email");
            return Ok(());
        }

        let mut links = Vec::with_capacity(rows.len());
        for user in &rows {
            let token = self.tokens.issue_password_reset_token(user)?;
            let record = PasswordResetRecord::new(email, user.tenant_id, &token);
            self.resets.insert(&record).await?;
            links.push(TenantResetLink {
                tenant_name: user.tenant.name.clone(),
                reset_link: self.reset_link(&token),
            });
        }

        let outcome = match rows.as_slice() {
            [user] => {
                self.notifier
                    .send_password_reset(&PublicUser::from(user), &links[0].reset_link, locale)
                    .await
            }
            _ => {
                self.notifier
                    .send_multi_tenant_password_reset(email, &links, locale)
                    .await
            }
        };
        if let Err(e) = outcome {
            warn!(email = %email, error = %e, "password reset notification failed");
        }
        Ok(())
    }

    /// Set a new password against a previously issued reset token. Every
    /// defect answers with the same generic validation error.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if password.is_empty() || password != confirm_password {
            return Err(AuthError::validation(RESET_FAILED));
        }

        let user = self
            .resolve_reset_user(token)
            .await
            .map_err(|e| {
                warn!(error = %e, "password reset token rejected");
                AuthError::validation(RESET_FAILED)
            })?;

        let hash = self.passwords.hash(password)?;
        self.users.update_password(user.id, &hash).await?;
        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    async fn resolve_reset_user(&self, token: &str) -> Result<User> {
        let record = self
            .resets
            .find_by_token(token)
            .await?
            .ok_or_else(|| AuthError::validation("unknown reset token"))?;
        if record.is_expired(self.config.access_ttl(), Utc::now()) {
            return Err(AuthError::validation("reset token expired"));
        }

        let claims = self.tokens.verify_password_reset(token)?;
        self.users
            .find_by_id_in_tenant(claims.id, claims.tenant_id)
            .await?
            .filter(User::is_login_eligible)
            .ok_or_else(|| AuthError::validation("identity no longer eligible"))
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/#/auth/reset-password?token={}", self.config.client_base_url, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::domain::{Role, TenantInfo};
    use crate::notifier::TracingNotifier;

    fn tenant(name: &str) -> TenantInfo {
        TenantInfo {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            logo: None,
        }
    }

    fn harness(config: AuthConfig) -> (Arc<InMemoryDirectory>, PasswordResetService) {
        let dir = Arc::new(InMemoryDirectory::new());
        let tokens = Arc::new(TokenService::new(&config));
        let passwords = Arc::new(PasswordService::new(&AuthConfig {
            password_hash_cost: 8,
            ..config.clone()
        }));
        let service = PasswordResetService::new(
            config,
            dir.clone(),
            dir.clone(),
            tokens,
            passwords,
            Arc::new(TracingNotifier),
        );
        (dir, service)
    }

    #[tokio::test]
    async fn test_unknown_email_is_silent_success() {
        let (dir, service) = harness(AuthConfig::new("s", "r"));
        service.request_reset("nobody@x.com", "en").await;
        assert!(dir.password_resets_for_email("nobody@x.com").is_empty());
    }

    #[tokio::test]
    async fn test_one_record_per_matching_tenant() {
        let (dir, service) = harness(AuthConfig::new("s", "r"));
        dir.add_user(User::new(tenant("T1"), "a@x.com", Role::Employee));
        dir.add_user(User::new(tenant("T2"), "a@x.com", Role::Admin));

        service.request_reset("a@x.com", "en").await;
        assert_eq!(dir.password_resets_for_email("a@x.com").len(), 2);
    }

    #[tokio::test]
    async fn test_reset_round_trip() {
        let (dir, service) = harness(AuthConfig::new("s", "r"));
        let user = User::new(tenant("T1"), "a@x.com", Role::Employee);
        let user_id = user.id;
        dir.add_user(user);

        service.request_reset("a@x.com", "en").await;
        let token = dir.password_resets_for_email("a@x.com")[0].token.clone();

        service.reset_password(&token, "new-pw", "new-pw").await.unwrap();
        assert!(dir.get_user(user_id).unwrap().hash.is_some());
    }

    #[tokio::test]
    async fn test_mismatched_confirmation_rejected() {
        let (_, service) = harness(AuthConfig::new("s", "r"));
        let err = service.reset_password("tok", "a", "b").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_generically() {
        let mut config = AuthConfig::new("s", "r");
        config.jwt_access_ttl = -60;
        let (dir, service) = harness(config);
        dir.add_user(User::new(tenant("T1"), "a@x.com", Role::Employee));

        service.request_reset("a@x.com", "en").await;
        let token = dir.password_resets_for_email("a@x.com")[0].token.clone();

        let err = service.reset_password(&token, "pw", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected_generically() {
        let (_, service) = harness(AuthConfig::new("s", "r"));
        let err = service
            .reset_password("no-such-token", "pw", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }
}
