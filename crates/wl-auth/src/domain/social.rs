//! Social Account Link Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported OAuth providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocialProvider {
    Google,
    Github,
    Twitter,
    Facebook,
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocialProvider::Google => "GOOGLE",
            SocialProvider::Github => "GITHUB",
            SocialProvider::Twitter => "TWITTER",
            SocialProvider::Facebook => "FACEBOOK",
        };
        f.write_str(name)
    }
}

/// Identity proven by an external provider, decoded from its token.
/// Providers may withhold the email (hidden profile email on GitHub).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: SocialProvider,
    pub external_id: String,
    pub email: Option<String>,
}

/// Link between a provider account and a tenant-scoped user identity.
/// One provider account may link to rows in several tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccount {
    pub id: Uuid,
    pub provider: SocialProvider,
    pub provider_account_id: String,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl SocialAccount {
    pub fn new(
        provider: SocialProvider,
        provider_account_id: impl Into<String>,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            provider_account_id: provider_account_id.into(),
            user_id,
            tenant_id,
            created_at: Utc::now(),
        }
    }
}
