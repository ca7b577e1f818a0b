//! Domain Models
//!
//! Tenant-scoped entities for the auth core. Emails are unique per tenant
//! only; any cross-tenant lookup must resolve a set of rows, never assume
//! a single match.

pub mod employee;
pub mod invite;
pub mod membership;
pub mod password_reset;
pub mod social;
pub mod team;
pub mod user;

pub use employee::*;
pub use invite::*;
pub use membership::*;
pub use password_reset::*;
pub use social::*;
pub use team::*;
pub use user::*;
