//! # keel_api
//!
//! Axum integration for Keel services: the authentication gate, request
//! context binding, correlation ids and the canonical response envelope.

pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::post;

pub use context::{CurrentPrincipal, MaybePrincipal, TenantScope};
pub use error::{AppError, AppResult, Rejection};
pub use middleware::auth::{
    AuthGate, RoleGate, optional_auth, require_auth, require_roles, require_tenant,
};
pub use middleware::correlation::{CorrelationId, correlation_id};
pub use response::{ApiResponse, ErrorCode, ErrorEnvelope, PageMeta};

/// Path of the token refresh route added by [`auth_routes`].
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh";

/// Routes every service mounts unauthenticated: token refresh.
pub fn auth_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AuthGate: FromRef<S>,
{
    Router::new().route(AUTH_REFRESH_PATH, post(handlers::auth::refresh_handler))
}
