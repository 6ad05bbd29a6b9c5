//! Authentication and authorization logic.
//!
//! Provides bearer-token management, the request principal, and password
//! hashing that can be shared across `keel_api` and service binaries.

pub mod clock;
pub mod password;
pub mod principal;
pub mod token;

use std::fmt;

use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use principal::{Principal, RoleSet};
pub use token::{TokenClaims, TokenKind, TokenManager};

/// What was wrong with the presented credential before any token was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialDefect {
    /// No `Authorization` header at all.
    Absent,
    /// Header present but not exactly `Bearer <token>`.
    Malformed,
}

impl fmt::Display for CredentialDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialDefect::Absent => "Authorization header required",
            CredentialDefect::Malformed => "Invalid authorization header format",
        })
    }
}

/// Authentication errors.
///
/// Messages are deliberately generic: the edge never tells a caller which
/// token defect was detected.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    ExpiredToken,

    #[error("{0}")]
    MissingCredential(CredentialDefect),

    #[error("Tenant ID required")]
    MissingTenant,

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True when the caller has not proven an identity: no usable
    /// credential, or a token that failed verification.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MissingCredential(_)
        )
    }
}
