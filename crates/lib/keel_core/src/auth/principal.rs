//! The authenticated identity carried through one request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Role names with set semantics. Roles are opaque strings; there is no
/// hierarchy between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True if at least one of `required` is held. An empty `required` set
    /// never matches.
    pub fn has_any<I, R>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        required.into_iter().any(|r| self.contains(r.as_ref()))
    }

    /// True if every one of `required` is held. An empty `required` set
    /// always matches.
    pub fn has_all<I, R>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        required.into_iter().all(|r| self.contains(r.as_ref()))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(roles: Vec<String>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleSet> for Vec<String> {
    fn from(roles: RoleSet) -> Self {
        roles.0.into_iter().collect()
    }
}

/// Authenticated identity derived from a verified access token.
///
/// Immutable once constructed; handlers receive it by reference from the
/// request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    user_id: String,
    tenant_id: String,
    email: String,
    roles: RoleSet,
}

impl Principal {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        email: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            email: email.into(),
            roles,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Tenant the token was issued for. May be empty, in which case the
    /// tenant must come from elsewhere (see the tenant gate).
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn has_any_role<I, R>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        self.roles.has_any(required)
    }

    pub fn has_all_roles<I, R>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        self.roles.has_all(required)
    }
}
