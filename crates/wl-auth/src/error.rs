//! Auth Error Types
//!
//! The public taxonomy deliberately loses detail: credential and code
//! failures collapse into [`AuthError::Authentication`] so responses never
//! reveal which factor failed or whether an account exists. Rich context
//! stays in logs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad credential, bad magic code, or unresolvable identity.
    #[error("Authentication failed")]
    Authentication,

    /// Valid identity, insufficient or inconsistent claims.
    #[error("Authorization failed")]
    Authorization,

    /// Token is well-formed and correctly signed, but past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// Bad signature, wrong purpose, or malformed token.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Malformed or unsupported input.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Invite missing, already answered, or expired.
    #[error("Invite is not valid")]
    InvalidInvite,

    /// Unexpected failure; never surfaced verbatim across the public boundary.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Collapse any error kind into the generic authentication failure,
    /// preserving expiry discrimination where the token layer detected it.
    pub fn into_authentication(self) -> Self {
        match self {
            Self::TokenExpired => Self::TokenExpired,
            _ => Self::Authentication,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
