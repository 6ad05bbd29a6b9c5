//! Application error types.

use axum::response::{IntoResponse, Response};
use keel_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::middleware::correlation::CorrelationId;
use crate::response::{ErrorCode, ErrorEnvelope};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Render as an envelope. Internal details are logged, never sent.
    pub fn into_envelope(self, correlation_id: Option<String>) -> ErrorEnvelope {
        let code = self.code();
        let message = match self {
            AppError::BadRequest(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m) => m,
            AppError::Internal(detail) => {
                error!(detail = %detail, correlation_id = ?correlation_id, "internal error");
                "Internal server error".to_string()
            }
        };
        ErrorEnvelope::new(code, message, correlation_id)
    }

    /// Attach the request's correlation id.
    pub fn tagged(self, correlation_id: Option<&CorrelationId>) -> Rejection {
        Rejection {
            error: self,
            correlation_id: correlation_id.map(|c| c.as_str().to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_envelope(None).into_response()
    }
}

/// Error response for the gates and extractors: an [`AppError`] plus the
/// correlation id of the request it ends.
#[derive(Debug)]
pub struct Rejection {
    pub error: AppError,
    pub correlation_id: Option<String>,
}

impl From<AppError> for Rejection {
    fn from(error: AppError) -> Self {
        Self {
            error,
            correlation_id: None,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.error.into_envelope(self.correlation_id).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        if e.is_unauthenticated() {
            return AppError::Unauthorized(e.to_string());
        }
        match e {
            AuthError::MissingTenant => AppError::BadRequest(e.to_string()),
            AuthError::PermissionDenied => AppError::Forbidden(e.to_string()),
            AuthError::Signing(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use keel_core::auth::CredentialDefect;

    use super::*;

    #[test]
    fn auth_errors_map_to_codes() {
        let cases = [
            (AuthError::InvalidToken, ErrorCode::Unauthorized),
            (AuthError::ExpiredToken, ErrorCode::Unauthorized),
            (
                AuthError::MissingCredential(CredentialDefect::Absent),
                ErrorCode::Unauthorized,
            ),
            (
                AuthError::MissingCredential(CredentialDefect::Malformed),
                ErrorCode::Unauthorized,
            ),
            (AuthError::MissingTenant, ErrorCode::BadRequest),
            (AuthError::PermissionDenied, ErrorCode::Forbidden),
            (AuthError::Signing("boom".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code(), code);
        }
    }

    #[test]
    fn expired_and_invalid_are_indistinguishable() {
        let a = AppError::from(AuthError::InvalidToken).into_envelope(None);
        let b = AppError::from(AuthError::ExpiredToken).into_envelope(None);
        assert_eq!(a, b);
        assert_eq!(a.error.message, "Invalid or expired token");
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let env = AppError::Internal("db password wrong".into()).into_envelope(Some("c".into()));
        assert_eq!(env.error.message, "Internal server error");
        assert_eq!(env.correlation_id.as_deref(), Some("c"));
    }
}
