//! Token Service
//!
//! Signs and verifies the five JWT purposes used by the auth core.
//! Verification distinguishes `TokenExpired` (well-formed, past expiry)
//! from `InvalidToken` (bad signature or shape) so callers can drive
//! different client behavior for the two cases.
//!
//! Access tokens embed the permission snapshot supplied by the caller at
//! issuance time. The snapshot goes stale until the next issuance; that is
//! the documented contract, with `WorkspaceService::refresh_access_token`
//! as the explicit re-issuance path.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::User;
use crate::error::{AuthError, Result};

/// Claims embedded in access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Claims embedded in refresh tokens, enough to re-derive an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenClaims {
    pub id: Uuid,
    pub email: String,
    pub tenant_id: Uuid,
    pub role: String,
    pub exp: i64,
}

/// Short-lived token binding a resolved workspace choice to its one-time
/// finalize call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceTokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub tenant_id: Uuid,
    pub code: String,
    pub exp: i64,
}

/// Invite tokens carry no expiry of their own; the invite row's nullable
/// `expire_at` governs instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTokenClaims {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetClaims {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub exp: i64,
}

/// SHA-256 hex digest of a refresh token, the only form ever persisted
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct TokenService {
    secret: String,
    refresh_secret: String,
    access_ttl: i64,
    refresh_ttl: i64,
    workspace_ttl: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            refresh_secret: config.jwt_refresh_secret.clone(),
            access_ttl: config.jwt_access_ttl,
            refresh_ttl: config.jwt_refresh_ttl,
            // A workspace token is only useful while its magic code lives
            workspace_ttl: config.magic_code_ttl,
        }
    }

    pub fn issue_access(
        &self,
        user: &User,
        employee_id: Option<Uuid>,
        permissions: Vec<String>,
    ) -> Result<String> {
        let claims = AccessTokenClaims {
            id: user.id,
            tenant_id: user.tenant_id,
            employee_id,
            role: user.role.name().to_string(),
            permissions,
            exp: expiry(self.access_ttl),
        };
        self.sign(&claims, &self.secret)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String> {
        let claims = RefreshTokenClaims {
            id: user.id,
            email: user.email.clone(),
            tenant_id: user.tenant_id,
            role: user.role.name().to_string(),
            exp: expiry(self.refresh_ttl),
        };
        self.sign(&claims, &self.refresh_secret)
    }

    pub fn issue_workspace_token(&self, user: &User, code: &str) -> Result<String> {
        let claims = WorkspaceTokenClaims {
            user_id: user.id,
            email: user.email.clone(),
            tenant_id: user.tenant_id,
            code: code.to_string(),
            exp: expiry(self.workspace_ttl),
        };
        self.sign(&claims, &self.secret)
    }

    pub fn issue_invite_token(&self, email: &str, code: &str) -> Result<String> {
        let claims = InviteTokenClaims {
            email: email.to_string(),
            code: code.to_string(),
        };
        self.sign(&claims, &self.secret)
    }

    pub fn issue_password_reset_token(&self, user: &User) -> Result<String> {
        let claims = PasswordResetClaims {
            id: user.id,
            tenant_id: user.tenant_id,
            exp: expiry(self.access_ttl),
        };
        self.sign(&claims, &self.secret)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessTokenClaims> {
        self.decode_claims(token, &self.secret, true)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshTokenClaims> {
        self.decode_claims(token, &self.refresh_secret, true)
    }

    pub fn verify_workspace(&self, token: &str) -> Result<WorkspaceTokenClaims> {
        self.decode_claims(token, &self.secret, true)
    }

    pub fn verify_invite(&self, token: &str) -> Result<InviteTokenClaims> {
        self.decode_claims(token, &self.secret, false)
    }

    pub fn verify_password_reset(&self, token: &str) -> Result<PasswordResetClaims> {
        self.decode_claims(token, &self.secret, true)
    }

    fn sign<T: Serialize>(&self, claims: &T, secret: &str) -> Result<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::internal(format!("token signing failed: {e}")))
    }

    fn decode_claims<T: DeserializeOwned>(
        &self,
        token: &str,
        secret: &str,
        validate_exp: bool,
    ) -> Result<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        if !validate_exp {
            validation.required_spec_claims.clear();
        }

        decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::invalid_token(e.to_string()),
            })
    }
}

fn expiry(ttl_seconds: i64) -> i64 {
    Utc::now().timestamp() + ttl_seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TenantInfo};

    fn user() -> User {
        let tenant = TenantInfo {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            logo: None,
        };
        User::new(tenant, "a@x.com", Role::Admin)
    }

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::new("access-secret", "refresh-secret"))
    }

    #[test]
    fn test_access_token_embeds_permission_snapshot() {
        let service = service();
        let user = user();
        let token = service
            .issue_access(&user, None, vec!["org:read".to_string()])
            .unwrap();

        let claims = service.verify_access(&token).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.tenant_id, user.tenant_id);
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.permissions, vec!["org:read"]);
    }

    #[test]
    fn test_refresh_uses_separate_secret() {
        let service = service();
        let token = service.issue_refresh(&user()).unwrap();

        // A refresh token must not verify under the access secret
        assert!(matches!(
            service.verify_workspace(&token),
            Err(AuthError::InvalidToken { .. })
        ));
        assert!(service.verify_refresh(&token).is_ok());
    }

    #[test]
    fn test_expired_token_is_distinguishable() {
        let mut service = service();
        service.workspace_ttl = -60;
        let token = service.issue_workspace_token(&user(), "ABC123").unwrap();

        assert!(matches!(
            service.verify_workspace(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampered_token_is_invalid_not_expired() {
        let service = service();
        let mut token = service.issue_workspace_token(&user(), "ABC123").unwrap();
        token.push('x');

        assert!(matches!(
            service.verify_workspace(&token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_invite_token_has_no_expiry() {
        let service = service();
        let token = service.issue_invite_token("new@x.com", "CODE42").unwrap();
        let claims = service.verify_invite(&token).unwrap();
        assert_eq!(claims.email, "new@x.com");
        assert_eq!(claims.code, "CODE42");
    }

    #[test]
    fn test_refresh_token_hash_is_stable_hex() {
        let h1 = hash_refresh_token("tok");
        let h2 = hash_refresh_token("tok");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_refresh_token("tok2"));
    }
}
