//! Service Layer
//!
//! Business logic for authentication, workspace resolution, invites,
//! session authorization, and password reset.

pub mod invite;
pub mod magic_code;
pub mod password;
pub mod password_reset;
pub mod session;
pub mod social;
pub mod token;
pub mod workspace;

pub use invite::{AcceptInviteInput, InviteCredential, InviteService};
pub use magic_code::MagicCodeService;
pub use password::PasswordService;
pub use password_reset::PasswordResetService;
pub use session::{SessionClaims, SessionContext, SessionService};
pub use social::{ProviderVerifier, SocialService, VerifierRegistry};
pub use token::{
    hash_refresh_token, AccessTokenClaims, InviteTokenClaims, PasswordResetClaims,
    RefreshTokenClaims, TokenService, WorkspaceTokenClaims,
};
pub use workspace::{AuthResult, WorkspaceDescriptor, WorkspaceListing, WorkspaceService};
