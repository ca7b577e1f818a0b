//! Magic Code Service
//!
//! Passwordless code lifecycle. One email maps to identity rows in any
//! number of tenants, so a code is written to every surviving row in a
//! single batch: the same code and expiry everywhere, all rows or none.
//! Single use is enforced by clearing the code fields on consumption.
//!
//! Two concurrent issuances for the same email race last-write-wins; with
//! short TTLs that is an accepted outcome.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AuthConfig, DEMO_MAGIC_CODE, MAGIC_CODE_LENGTH};
use crate::directory::UserDirectory;
use crate::domain::User;
use crate::error::Result;
use crate::notifier::Notifier;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate one fixed-length alphanumeric code
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..MAGIC_CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

pub struct MagicCodeService {
    config: AuthConfig,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl MagicCodeService {
    pub fn new(config: AuthConfig, users: Arc<dyn UserDirectory>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            users,
            notifier,
        }
    }

    /// Pick the code for an email: the fixed deterministic code for
    /// allow-listed demo emails, a fresh random one otherwise.
    fn code_for(&self, email: &str) -> (String, bool) {
        if self.config.is_demo_email(email) {
            (DEMO_MAGIC_CODE.to_string(), true)
        } else {
            (generate_code(), false)
        }
    }

    /// Write one code with one shared expiry to the given rows
    pub async fn issue_for_rows(
        &self,
        ids: &[Uuid],
        email: &str,
    ) -> Result<(String, DateTime<Utc>)> {
        let (code, _) = self.code_for(email);
        let expire_at = Utc::now() + self.config.magic_code_ttl();
        self.users.set_magic_code(ids, email, &code, expire_at).await?;
        Ok((code, expire_at))
    }

    /// Issue a code to every active identity row matching the email
    pub async fn issue_for_email(&self, email: &str) -> Result<(String, DateTime<Utc>)> {
        let users = self.users.find_active_by_email(email).await?;
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        self.issue_for_rows(&ids, email).await
    }

    /// Rows whose code matches and has not expired. On success the code
    /// fields are cleared on every returned row, so a second consume with
    /// the same code finds nothing.
    pub async fn consume(&self, email: &str, code: &str) -> Result<Vec<User>> {
        let users = self.users.find_for_code_signin(email, code, Utc::now()).await?;
        if !users.is_empty() {
            let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
            self.users.clear_magic_code(&ids).await?;
        }
        Ok(users)
    }

    /// Outbound passwordless flow: issue a code for the email and notify.
    /// Deliberately void-shaped; failures are logged, never surfaced, so
    /// the caller's response cannot reveal whether the account exists.
    pub async fn send_magic_code(&self, email: &str, locale: &str) {
        if email.is_empty() {
            warn!("magic code requested without an email");
            return;
        }

        let users = match self.users.find_active_by_email(email).await {
            Ok(users) => users,
            Err(e) => {
                warn!(email = %email, error = %e, "magic code lookup failed");
                return;
            }
        };
        // No live rows means no code and no notification
        if users.is_empty() {
            info!(email = %email, "magic code requested with no active identity");
            return;
        }

        let (code, is_demo) = self.code_for(email);
        let expire_at = Utc::now() + self.config.magic_code_ttl();
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        if let Err(e) = self.users.set_magic_code(&ids, email, &code, expire_at).await {
            warn!(email = %email, error = %e, "magic code write failed");
            return;
        }

        // Demo codes are deterministic; sending them would be noise
        if is_demo {
            return;
        }

        let magic_link = format!(
            "{}/#/auth/magic-signin?email={}&code={}",
            self.config.client_base_url, email, code
        );
        if let Err(e) = self.notifier.send_magic_code(email, &code, &magic_link, locale).await {
            warn!(email = %email, error = %e, "magic code notification failed");
        }
    }
}
