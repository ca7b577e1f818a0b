//! Password Service
//!
//! Argon2id hashing with the memory cost taken from configuration.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

pub struct PasswordService {
    memory_cost_kib: u32,
}

impl PasswordService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            memory_cost_kib: config.password_hash_cost,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_cost_kib, 2, 1, None)
            .map_err(|e| AuthError::internal(format!("invalid argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext against a stored hash. A passwordless identity
    /// (no hash) never matches; a malformed stored hash is treated the
    /// same way rather than erroring out mid-login.
    pub fn verify(&self, hash: Option<&str>, plaintext: &str) -> bool {
        let Some(hash) = hash else {
            return false;
        };

        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
