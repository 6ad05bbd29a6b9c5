//! Request-scoped identity: binds the [`Principal`] to the request's
//! extension bag and reads it back.
//!
//! The principal is written once by the authentication gate. Later units can
//! only add a tenant scope, and only when the principal carries no tenant.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use keel_core::auth::{AuthError, CredentialDefect, Principal, RoleSet};

use crate::error::{AppError, Rejection};
use crate::middleware::correlation;

static NO_ROLES: RoleSet = RoleSet::new();

/// Tenant resolved from outside the principal (the `X-Tenant-ID` fallback).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScopedTenant(String);

/// Attach `principal` to the request. Returns `false` and leaves the
/// existing principal untouched if one is already attached.
pub fn attach(extensions: &mut Extensions, principal: Principal) -> bool {
    if extensions.get::<Principal>().is_some() {
        return false;
    }
    extensions.insert(principal);
    true
}

pub fn principal(extensions: &Extensions) -> Option<&Principal> {
    extensions.get::<Principal>()
}

/// Roles of the attached principal; empty when none is attached.
pub fn roles(extensions: &Extensions) -> &RoleSet {
    principal(extensions).map_or(&NO_ROLES, Principal::roles)
}

/// False for an empty `required` list.
pub fn has_any_role<I, R>(extensions: &Extensions, required: I) -> bool
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    roles(extensions).has_any(required)
}

/// True for an empty `required` list.
pub fn has_all_roles<I, R>(extensions: &Extensions, required: I) -> bool
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    roles(extensions).has_all(required)
}

/// The tenant this request is scoped to: the principal's tenant if it has
/// one, otherwise a tenant recorded by [`scope_tenant`].
pub fn tenant_id(extensions: &Extensions) -> Option<&str> {
    principal(extensions)
        .map(Principal::tenant_id)
        .filter(|t| !t.is_empty())
        .or_else(|| extensions.get::<ScopedTenant>().map(|t| t.0.as_str()))
}

/// Record a tenant for a request whose principal carries none. Refuses
/// (returns `false`) when a tenant is already resolvable.
pub fn scope_tenant(extensions: &mut Extensions, tenant: impl Into<String>) -> bool {
    if tenant_id(extensions).is_some() {
        return false;
    }
    extensions.insert(ScopedTenant(tenant.into()));
    true
}

fn reject(parts: &Parts, error: AuthError) -> Rejection {
    AppError::from(error).tagged(correlation::current(&parts.extensions))
}

/// Extractor for handlers behind `require_auth`. Rejects with 401 when no
/// principal is attached.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal(&parts.extensions)
            .cloned()
            .map(Self)
            .ok_or_else(|| reject(parts, AuthError::MissingCredential(CredentialDefect::Absent)))
    }
}

/// Extractor for handlers behind `optional_auth`.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(principal(&parts.extensions).cloned()))
    }
}

/// Extractor for the resolved tenant. Rejects with 400 when none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope(pub String);

impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        tenant_id(&parts.extensions)
            .map(|t| Self(t.to_string()))
            .ok_or_else(|| reject(parts, AuthError::MissingTenant))
    }
}
