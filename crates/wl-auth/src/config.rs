//! Auth Configuration
//!
//! All secrets, TTLs, and deployment toggles are injected through this
//! struct at construction time. Nothing in the services reads the ambient
//! environment per call, so tests can run with deterministic settings.

use chrono::Duration;

/// Length of generated magic codes.
pub const MAGIC_CODE_LENGTH: usize = 6;

/// Fixed code substituted for allow-listed emails in demo deployments.
pub const DEMO_MAGIC_CODE: &str = "123456";

/// Configuration for the auth engine
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for access, workspace, invite, and password-reset tokens
    pub jwt_secret: String,
    /// Separate secret for refresh tokens
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds
    pub jwt_access_ttl: i64,
    /// Refresh token lifetime in seconds
    pub jwt_refresh_ttl: i64,
    /// Magic code (and workspace token) lifetime in seconds
    pub magic_code_ttl: i64,
    /// Argon2 memory cost in KiB
    pub password_hash_cost: u32,
    /// Demo deployments substitute a fixed code for allow-listed emails
    pub demo_mode: bool,
    /// Emails eligible for the demo-mode fixed code
    pub demo_allowlist: Vec<String>,
    /// Base URL for magic links and password-reset links
    pub client_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_refresh_secret: String::new(),
            jwt_access_ttl: 86400,
            jwt_refresh_ttl: 7 * 86400,
            magic_code_ttl: 600,
            password_hash_cost: 19456,
            demo_mode: false,
            demo_allowlist: Vec::new(),
            client_base_url: "http://localhost:4200".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create config with the given signing secrets and defaults elsewhere
    pub fn new(jwt_secret: impl Into<String>, jwt_refresh_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_refresh_secret: jwt_refresh_secret.into(),
            ..Default::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            jwt_refresh_secret: std::env::var("JWT_REFRESH_SECRET").unwrap_or_default(),
            jwt_access_ttl: env_i64("JWT_ACCESS_TTL", defaults.jwt_access_ttl),
            jwt_refresh_ttl: env_i64("JWT_REFRESH_TTL", defaults.jwt_refresh_ttl),
            magic_code_ttl: env_i64("MAGIC_CODE_TTL", defaults.magic_code_ttl),
            password_hash_cost: std::env::var("PASSWORD_HASH_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.password_hash_cost),
            demo_mode: std::env::var("DEMO_MODE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            demo_allowlist: std::env::var("DEMO_ALLOWLIST")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            client_base_url: std::env::var("CLIENT_BASE_URL").unwrap_or(defaults.client_base_url),
        }
    }

    pub fn with_demo_mode(mut self, allowlist: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.demo_mode = true;
        self.demo_allowlist = allowlist.into_iter().map(|e| e.into().to_lowercase()).collect();
        self
    }

    pub fn with_magic_code_ttl(mut self, seconds: i64) -> Self {
        self.magic_code_ttl = seconds;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(self.jwt_access_ttl)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.jwt_refresh_ttl)
    }

    pub fn magic_code_ttl(&self) -> Duration {
        Duration::seconds(self.magic_code_ttl)
    }

    /// True when demo mode is on and the email is allow-listed
    pub fn is_demo_email(&self, email: &str) -> bool {
        self.demo_mode && self.demo_allowlist.iter().any(|e| e == &email.to_lowercase())
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
