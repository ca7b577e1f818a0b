//! Worklane Auth
//!
//! Multi-tenant authentication and workspace resolution:
//! - Credential verification (Argon2id) against tenant-scoped identities
//! - Workspace resolution: one email, N tenant identities, explicit choice
//! - Magic code lifecycle with batch issuance and single use
//! - JWT issuance and verification for five token purposes
//! - Social sign-in with provider-side token verification
//! - Invite acceptance with identity provisioning
//! - Session authorization against live rows
//! - Anti-enumeration password reset

pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod notifier;
pub mod service;

pub use config::AuthConfig;
pub use error::{AuthError, Result};
