//! Authentication gate: bearer extraction, token verification, tenant
//! scoping and role predicates.
//!
//! Each unit is an axum `from_fn` middleware. Order them outermost-first as
//! `require_auth` (or `optional_auth`) → `require_tenant` → `require_roles`;
//! with axum's `.layer` that means adding them in the reverse order.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderName;
use keel_core::auth::{AuthError, CredentialDefect, Principal, RoleSet, TokenManager};
use tracing::debug;

use crate::context;
use crate::error::{AppError, Rejection};
use crate::middleware::correlation;

pub static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// State for the authentication units: the process-wide token manager.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenManager>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Extract and verify the bearer token from `headers`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers)?;
        self.tokens.verify(token)
    }
}

/// The token from an `Authorization: Bearer <token>` header.
///
/// The value must be exactly two space-separated parts with the `Bearer`
/// scheme; anything else is malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential(CredentialDefect::Absent))?;
    let malformed = AuthError::MissingCredential(CredentialDefect::Malformed);
    let value = value.to_str().map_err(|_| malformed)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MissingCredential(CredentialDefect::Malformed)),
    }
}

fn reject(request: &Request, error: AuthError) -> Rejection {
    AppError::from(error).tagged(correlation::current(request.extensions()))
}

/// Axum middleware: require a valid access token and attach its principal.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let principal = match gate.authenticate(request.headers()) {
        Ok(principal) => principal,
        Err(e) => {
            debug!(error = ?e, path = %request.uri().path(), "authentication rejected");
            return Err(reject(&request, e));
        }
    };

    if !context::attach(request.extensions_mut(), principal) {
        debug!("principal already attached, keeping the first");
    }
    Ok(next.run(request).await)
}

/// Axum middleware: attach a principal when a valid token is present.
/// Never rejects.
pub async fn optional_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.authenticate(request.headers()) {
        Ok(principal) => {
            context::attach(request.extensions_mut(), principal);
        }
        Err(e) => debug!(error = ?e, "optional auth: continuing anonymously"),
    }
    next.run(request).await
}

/// Axum middleware: require a tenant, falling back to `X-Tenant-ID` when the
/// principal carries none.
pub async fn require_tenant(mut request: Request, next: Next) -> Result<Response, Rejection> {
    if context::tenant_id(request.extensions()).is_none() {
        let header = request
            .headers()
            .get(&X_TENANT_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        match header {
            Some(tenant) => {
                context::scope_tenant(request.extensions_mut(), tenant);
            }
            None => {
                debug!(path = %request.uri().path(), "no tenant resolvable");
                return Err(reject(&request, AuthError::MissingTenant));
            }
        }
    }
    Ok(next.run(request).await)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleMatch {
    Any,
    All,
}

/// State for [`require_roles`]: which roles, and whether any or all of them
/// are needed.
#[derive(Debug, Clone)]
pub struct RoleGate {
    mode: RoleMatch,
    roles: Arc<RoleSet>,
}

impl RoleGate {
    /// Pass if the principal holds at least one of `roles`. An empty list
    /// never passes.
    pub fn any_of<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            mode: RoleMatch::Any,
            roles: Arc::new(roles.into_iter().collect()),
        }
    }

    /// Pass if the principal holds every one of `roles`. An empty list
    /// passes any authenticated principal.
    pub fn all_of<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            mode: RoleMatch::All,
            roles: Arc::new(roles.into_iter().collect()),
        }
    }

    /// Requests with no principal are always denied.
    pub fn permits(&self, principal: Option<&Principal>) -> bool {
        let Some(principal) = principal else {
            return false;
        };
        match self.mode {
            RoleMatch::Any => principal.has_any_role(self.roles.iter()),
            RoleMatch::All => principal.has_all_roles(self.roles.iter()),
        }
    }
}

/// Axum middleware: enforce a [`RoleGate`].
pub async fn require_roles(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, Rejection> {
    if !gate.permits(context::principal(request.extensions())) {
        debug!(
            mode = ?gate.mode,
            required = ?gate.roles.to_vec(),
            path = %request.uri().path(),
            "role check failed"
        );
        return Err(reject(&request, AuthError::PermissionDenied));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(auth: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = auth {
            h.insert(AUTHORIZATION, HeaderValue::from_static(v));
        }
        h
    }

    fn defect(h: &HeaderMap) -> Option<CredentialDefect> {
        match bearer_token(h) {
            Err(AuthError::MissingCredential(d)) => Some(d),
            _ => None,
        }
    }

    #[test]
    fn extracts_well_formed_bearer() {
        assert_eq!(bearer_token(&headers(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn absent_header() {
        assert_eq!(defect(&headers(None)), Some(CredentialDefect::Absent));
    }

    #[test]
    fn malformed_headers() {
        for v in [
            "Token abc",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "Bearer a b",
            "Bearer  abc",
            "abc",
            "",
        ] {
            assert_eq!(
                defect(&headers(Some(v))),
                Some(CredentialDefect::Malformed),
                "{v:?}"
            );
        }
    }

    #[test]
    fn role_gate_denies_without_principal() {
        assert!(!RoleGate::all_of(Vec::<String>::new()).permits(None));
        assert!(!RoleGate::any_of(["admin"]).permits(None));
    }

    #[test]
    fn role_gate_modes() {
        let p = Principal::new("u", "t", "", ["editor", "viewer"].into_iter().collect());
        assert!(RoleGate::any_of(["admin", "editor"]).permits(Some(&p)));
        assert!(!RoleGate::all_of(["editor", "admin"]).permits(Some(&p)));
        assert!(RoleGate::all_of(["viewer"]).permits(Some(&p)));
        assert!(!RoleGate::any_of(Vec::<String>::new()).permits(Some(&p)));
        assert!(RoleGate::all_of(Vec::<String>::new()).permits(Some(&p)));
    }
}
