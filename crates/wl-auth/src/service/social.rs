//! Social Sign-in Service
//!
//! Provider access tokens are verified against the provider's own API,
//! never decoded locally. A verified external identity resolves through
//! its email to the same multi-workspace listing as the password flow,
//! with missing provider links auto-created along the way.

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::directory::{SocialAccountDirectory, UserDirectory};
use crate::domain::{ExternalIdentity, SocialAccount, SocialProvider, User};
use crate::error::{AuthError, Result};
use crate::service::magic_code::MagicCodeService;
use crate::service::workspace::{dedupe_by_tenant, WorkspaceListing, WorkspaceService};

/// Verifies a provider-issued access token and returns the external
/// identity it belongs to
#[async_trait]
pub trait ProviderVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<ExternalIdentity>;
}

/// Provider dispatch table. An unregistered provider is a validation
/// error, not a panic.
#[derive(Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<SocialProvider, Arc<dyn ProviderVerifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider wired up
    pub fn with_builtin_providers() -> Self {
        let client = Client::new();
        let mut registry = Self::new();
        registry.register(SocialProvider::Google, Arc::new(GoogleVerifier::new(client.clone())));
        registry.register(SocialProvider::Github, Arc::new(GithubVerifier::new(client.clone())));
        registry.register(SocialProvider::Twitter, Arc::new(TwitterVerifier::new(client.clone())));
        registry.register(SocialProvider::Facebook, Arc::new(FacebookVerifier::new(client)));
        registry
    }

    pub fn register(&mut self, provider: SocialProvider, verifier: Arc<dyn ProviderVerifier>) {
        self.verifiers.insert(provider, verifier);
    }

    fn get(&self, provider: SocialProvider) -> Result<&Arc<dyn ProviderVerifier>> {
        self.verifiers
            .get(&provider)
            .ok_or_else(|| AuthError::validation(format!("unsupported social provider: {provider}")))
    }
}

pub struct SocialService {
    users: Arc<dyn UserDirectory>,
    social_accounts: Arc<dyn SocialAccountDirectory>,
    magic: Arc<MagicCodeService>,
    workspace: Arc<WorkspaceService>,
    verifiers: VerifierRegistry,
}

impl SocialService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        social_accounts: Arc<dyn SocialAccountDirectory>,
        magic: Arc<MagicCodeService>,
        workspace: Arc<WorkspaceService>,
        verifiers: VerifierRegistry,
    ) -> Self {
        Self {
            users,
            social_accounts,
            magic,
            workspace,
            verifiers,
        }
    }

    /// Verify a provider access token against the provider's API
    pub async fn verify_provider_token(
        &self,
        provider: SocialProvider,
        access_token: &str,
    ) -> Result<ExternalIdentity> {
        self.verifiers.get(provider)?.verify(access_token).await
    }

    /// Whether any link row exists for this external identity
    pub async fn link_exists(&self, provider: SocialProvider, external_id: &str) -> Result<bool> {
        let links = self.social_accounts.find_by_provider(provider, external_id).await?;
        Ok(!links.is_empty())
    }

    /// Create a link row binding a local identity to an external one
    pub async fn link_social_account(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        provider: SocialProvider,
        external_id: &str,
    ) -> Result<SocialAccount> {
        let account = SocialAccount::new(provider, external_id, user_id, tenant_id);
        self.social_accounts.insert(&account).await?;
        info!(user_id = %user_id, provider = %provider, "social account linked");
        Ok(account)
    }

    /// Social entry into the workspace flow: verify the provider token,
    /// resolve the verified email to its identity rows, auto-link any row
    /// the provider has not been linked to yet, then issue a fresh magic
    /// code and return the listing. Unlike the code flow, this path always
    /// mints a new code.
    pub async fn signin_by_social(
        &self,
        provider: SocialProvider,
        access_token: &str,
        include_teams: bool,
    ) -> Result<WorkspaceListing> {
        let identity = self.verify_provider_token(provider, access_token).await?;
        let email = identity.email.as_deref().ok_or_else(|| {
            AuthError::validation(format!("{provider} token carries no email"))
        })?;

        let rows = self.users.find_active_by_email(email).await?;
        if rows.is_empty() {
            warn!(provider = %provider, "social signin matched no workspace");
            return Err(AuthError::Authentication);
        }
        let rows = dedupe_by_tenant(rows);

        self.ensure_links(&rows, provider, &identity.external_id).await?;

        let ids: Vec<Uuid> = rows.iter().map(|u| u.id).collect();
        let (code, _) = self.magic.issue_for_rows(&ids, email).await?;
        self.workspace.build_listing(&rows, email, &code, include_teams).await
    }

    /// Create the missing link rows for every resolved identity, in
    /// parallel. Existing links are left alone.
    async fn ensure_links(
        &self,
        rows: &[User],
        provider: SocialProvider,
        external_id: &str,
    ) -> Result<()> {
        let existing = self.social_accounts.find_by_provider(provider, external_id).await?;
        let missing: Vec<&User> = rows
            .iter()
            .filter(|u| !existing.iter().any(|a| a.user_id == u.id))
            .collect();

        try_join_all(missing.iter().map(|u| {
            self.link_social_account(u.id, u.tenant_id, provider, external_id)
        }))
        .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
}

pub struct GoogleVerifier {
    client: Client,
}

impl GoogleVerifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderVerifier for GoogleVerifier {
    async fn verify(&self, access_token: &str) -> Result<ExternalIdentity> {
        let info: GoogleUserInfo = self
            .client
            .get("https://www.googleapis.com/oauth2/v3/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("google userinfo request failed: {e}")))?
            .error_for_status()
            .map_err(|_| AuthError::Authentication)?
            .json()
            .await
            .map_err(|e| AuthError::internal(format!("google userinfo decode failed: {e}")))?;

        Ok(ExternalIdentity {
            provider: SocialProvider::Google,
            external_id: info.sub,
            email: info.email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

pub struct GithubVerifier {
    client: Client,
}

impl GithubVerifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn primary_email(&self, access_token: &str) -> Result<Option<String>> {
        let emails: Vec<GithubEmail> = self
            .client
            .get("https://api.github.com/user/emails")
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, "worklane-auth")
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("github emails request failed: {e}")))?
            .error_for_status()
            .map_err(|_| AuthError::Authentication)?
            .json()
            .await
            .map_err(|e| AuthError::internal(format!("github emails decode failed: {e}")))?;

        Ok(emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }
}

#[async_trait]
impl ProviderVerifier for GithubVerifier {
    async fn verify(&self, access_token: &str) -> Result<ExternalIdentity> {
        let user: GithubUser = self
            .client
            .get("https://api.github.com/user")
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, "worklane-auth")
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("github user request failed: {e}")))?
            .error_for_status()
            .map_err(|_| AuthError::Authentication)?
            .json()
            .await
            .map_err(|e| AuthError::internal(format!("github user decode failed: {e}")))?;

        // The public profile email may be hidden; fall back to the emails API
        let email = match user.email {
            Some(email) => Some(email),
            None => self.primary_email(access_token).await?,
        };

        Ok(ExternalIdentity {
            provider: SocialProvider::Github,
            external_id: user.id.to_string(),
            email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id_str: String,
    email: Option<String>,
}

pub struct TwitterVerifier {
    client: Client,
}

impl TwitterVerifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderVerifier for TwitterVerifier {
    async fn verify(&self, access_token: &str) -> Result<ExternalIdentity> {
        let user: TwitterUser = self
            .client
            .get("https://api.twitter.com/1.1/account/verify_credentials.json")
            .query(&[("include_email", "true")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("twitter request failed: {e}")))?
            .error_for_status()
            .map_err(|_| AuthError::Authentication)?
            .json()
            .await
            .map_err(|e| AuthError::internal(format!("twitter decode failed: {e}")))?;

        Ok(ExternalIdentity {
            provider: SocialProvider::Twitter,
            external_id: user.id_str,
            email: user.email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    email: Option<String>,
}

pub struct FacebookVerifier {
    client: Client,
}

impl FacebookVerifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderVerifier for FacebookVerifier {
    async fn verify(&self, access_token: &str) -> Result<ExternalIdentity> {
        let user: FacebookUser = self
            .client
            .get("https://graph.facebook.com/me")
            .query(&[("fields", "id,email"), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("facebook request failed: {e}")))?
            .error_for_status()
            .map_err(|_| AuthError::Authentication)?
            .json()
            .await
            .map_err(|e| AuthError::internal(format!("facebook decode failed: {e}")))?;

        Ok(ExternalIdentity {
            provider: SocialProvider::Facebook,
            external_id: user.id,
            email: user.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::directory::InMemoryDirectory;
    use crate::domain::{Role, TenantInfo};
    use crate::notifier::TracingNotifier;
    use crate::service::workspace::build_workspace_service;

    struct StaticVerifier {
        identity: ExternalIdentity,
    }

    #[async_trait]
    impl ProviderVerifier for StaticVerifier {
        async fn verify(&self, access_token: &str) -> Result<ExternalIdentity> {
            if access_token == "good" {
                Ok(self.identity.clone())
            } else {
                Err(AuthError::Authentication)
            }
        }
    }

    fn tenant(name: &str) -> TenantInfo {
        TenantInfo {
            id: Uuid::new_v4(),
            name: name.to_string(),
            logo: None,
        }
    }

    fn harness(identity: ExternalIdentity) -> (Arc<InMemoryDirectory>, SocialService) {
        let config = AuthConfig::new("s", "r");
        let dir = Arc::new(InMemoryDirectory::new());
        let notifier: Arc<dyn crate::notifier::Notifier> = Arc::new(TracingNotifier);
        let workspace = Arc::new(build_workspace_service(
            config.clone(),
            dir.clone(),
            notifier.clone(),
        ));
        let magic = Arc::new(MagicCodeService::new(config, dir.clone(), notifier));

        let mut verifiers = VerifierRegistry::new();
        let provider = identity.provider;
        verifiers.register(provider, Arc::new(StaticVerifier { identity }));

        let service = SocialService::new(dir.clone(), dir.clone(), magic, workspace, verifiers);
        (dir, service)
    }

    fn google_identity(email: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: SocialProvider::Google,
            external_id: "ext-1".to_string(),
            email: Some(email.to_string()),
        }
    }

    #[test]
    fn test_builtin_registry_dispatches_every_provider() {
        let registry = VerifierRegistry::with_builtin_providers();
        for provider in [
            SocialProvider::Google,
            SocialProvider::Github,
            SocialProvider::Twitter,
            SocialProvider::Facebook,
        ] {
            assert!(registry.get(provider).is_ok());
        }
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_validation_error() {
        let (_, service) = harness(google_identity("a@x.com"));
        let err = service
            .verify_provider_token(SocialProvider::Twitter, "good")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_social_signin_links_all_matching_rows() {
        let (dir, service) = harness(google_identity("a@x.com"));
        let u1 = User::new(tenant("T1"), "a@x.com", Role::Employee);
        let u2 = User::new(tenant("T2"), "a@x.com", Role::Admin);
        let (id1, id2) = (u1.id, u2.id);
        dir.add_user(u1);
        dir.add_user(u2);

        let listing = service
            .signin_by_social(SocialProvider::Google, "good", false)
            .await
            .unwrap();
        assert_eq!(listing.total_workspaces, 2);
        assert_eq!(dir.social_accounts_for_user(id1).len(), 1);
        assert_eq!(dir.social_accounts_for_user(id2).len(), 1);

        // A second signin reuses the existing links
        service
            .signin_by_social(SocialProvider::Google, "good", false)
            .await
            .unwrap();
        assert_eq!(dir.social_accounts_for_user(id1).len(), 1);
    }

    #[tokio::test]
    async fn test_social_signin_issues_fresh_code() {
        let (dir, service) = harness(google_identity("a@x.com"));
        let user = User::new(tenant("T1"), "a@x.com", Role::Employee);
        let user_id = user.id;
        dir.add_user(user);

        service
            .signin_by_social(SocialProvider::Google, "good", false)
            .await
            .unwrap();
        assert!(dir.get_user(user_id).unwrap().code.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_tenant_rows_resolve_to_newest() {
        let (dir, service) = harness(google_identity("a@x.com"));
        let t = tenant("T1");
        let mut older = User::new(t.clone(), "a@x.com", Role::Employee);
        older.created_at = chrono::Utc::now() - chrono::Duration::days(2);
        let newer = User::new(t, "a@x.com", Role::Employee);
        let newer_id = newer.id;
        dir.add_user(older);
        dir.add_user(newer);

        let listing = service
            .signin_by_social(SocialProvider::Google, "good", false)
            .await
            .unwrap();
        assert_eq!(listing.total_workspaces, 1);
        assert_eq!(listing.workspaces[0].user.id, newer_id);
    }

    #[tokio::test]
    async fn test_unknown_email_is_generic_failure() {
        let (_, service) = harness(google_identity("nobody@x.com"));
        let err = service
            .signin_by_social(SocialProvider::Google, "good", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Authentication));
    }

    #[tokio::test]
    async fn test_bad_provider_token_fails_closed() {
        let (_, service) = harness(google_identity("a@x.com"));
        let err = service
            .verify_provider_token(SocialProvider::Google, "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Authentication));
    }
}
