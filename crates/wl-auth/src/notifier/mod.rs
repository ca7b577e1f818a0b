//! Notifier Collaborator
//!
//! Outbound email delivery is fire-and-forget from the auth core's point
//! of view: callers log delivery failures and keep going. Template
//! rendering and transport live elsewhere.

use async_trait::async_trait;

use crate::domain::PublicUser;

/// One reset link per tenant, for the multi-workspace reset email
#[derive(Debug, Clone)]
pub struct TenantResetLink {
    pub tenant_name: String,
    pub reset_link: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_magic_code(
        &self,
        email: &str,
        code: &str,
        magic_link: &str,
        locale: &str,
    ) -> anyhow::Result<()>;

    async fn send_password_reset(
        &self,
        user: &PublicUser,
        reset_link: &str,
        locale: &str,
    ) -> anyhow::Result<()>;

    async fn send_multi_tenant_password_reset(
        &self,
        email: &str,
        items: &[TenantResetLink],
        locale: &str,
    ) -> anyhow::Result<()>;

    async fn send_welcome(
        &self,
        user: &PublicUser,
        locale: &str,
        organization_id: Option<uuid::Uuid>,
        origin_url: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn send_invite(
        &self,
        email: &str,
        tenant_name: &str,
        invite_link: &str,
        locale: &str,
    ) -> anyhow::Result<()>;
}

/// Notifier that only logs, for embedded and development setups
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_magic_code(
        &self,
        email: &str,
        _code: &str,
        magic_link: &str,
        locale: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(email = %email, magic_link = %magic_link, locale = %locale, "magic code issued");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        user: &PublicUser,
        _reset_link: &str,
        locale: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(email = %user.email, locale = %locale, "password reset link issued");
        Ok(())
    }

    async fn send_multi_tenant_password_reset(
        &self,
        email: &str,
        items: &[TenantResetLink],
        locale: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(email = %email, tenants = items.len(), locale = %locale, "multi-tenant password reset issued");
        Ok(())
    }

    async fn send_welcome(
        &self,
        user: &PublicUser,
        locale: &str,
        organization_id: Option<uuid::Uuid>,
        _origin_url: Option<&str>,
    ) -> anyhow::Result<()> {
        tracing::info!(email = %user.email, ?organization_id, locale = %locale, "welcome email queued");
        Ok(())
    }

    async fn send_invite(
        &self,
        email: &str,
        tenant_name: &str,
        _invite_link: &str,
        locale: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(email = %email, tenant = %tenant_name, locale = %locale, "invite email queued");
        Ok(())
    }
}
