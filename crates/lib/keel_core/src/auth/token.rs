//! Bearer token minting and verification (HS256 JWT).

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::principal::{Principal, RoleSet};
use super::AuthError;
use crate::config::{AuthSettings, ConfigError, MAX_TTL_SECS};

/// Distinguishes the two token forms so one cannot stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of every token this crate issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub typ: TokenKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    fn into_principal(self) -> Principal {
        Principal::new(
            self.user_id,
            self.tenant_id,
            self.email,
            RoleSet::from(self.roles),
        )
    }
}

/// Stateless signer/verifier for one secret and TTL configuration.
///
/// Build once at startup and share behind an `Arc`; nothing here is mutated
/// after construction.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager reading the system clock.
    ///
    /// Fails if the secret is empty, a TTL is not positive or exceeds
    /// [`MAX_TTL_SECS`], or the refresh TTL is shorter than the access TTL.
    pub fn new(secret: &[u8], access_ttl: i64, refresh_ttl: i64) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::Invalid("token secret must not be empty".into()));
        }
        if access_ttl <= 0 {
            return Err(ConfigError::Invalid(format!(
                "access token TTL must be positive, got {access_ttl}"
            )));
        }
        if refresh_ttl <= 0 || refresh_ttl < access_ttl {
            return Err(ConfigError::Invalid(format!(
                "refresh token TTL must be positive and at least the access TTL ({access_ttl}), got {refresh_ttl}"
            )));
        }
        if refresh_ttl > MAX_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "token TTL must not exceed {MAX_TTL_SECS} seconds, got {refresh_ttl}"
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a manager from the `auth` settings slice.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        Self::new(
            settings.jwt_secret.as_bytes(),
            settings.access_ttl_secs,
            settings.refresh_ttl_secs,
        )
    }

    /// Replace the clock. Used by tests and by callers that apply skew.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Mint an access token embedding the full principal.
    pub fn issue_access(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        roles: &[String],
    ) -> Result<String, AuthError> {
        let roles = RoleSet::from(roles.to_vec());
        self.sign(user_id, tenant_id, email, roles.into(), TokenKind::Access)
    }

    /// Mint a refresh token. Carries no email and no roles.
    pub fn issue_refresh(&self, user_id: &str, tenant_id: &str) -> Result<String, AuthError> {
        self.sign(user_id, tenant_id, "", Vec::new(), TokenKind::Refresh)
    }

    /// Verify an access token and return its principal.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_kind(token, TokenKind::Access)
            .map(TokenClaims::into_principal)
    }

    /// Verify a refresh token and return the identity it was issued for.
    pub fn verify_refresh(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_kind(token, TokenKind::Refresh)
            .map(TokenClaims::into_principal)
    }

    /// Exchange a refresh token for a fresh access token for the same
    /// identity. Access tokens are not accepted here.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.verify_kind(refresh_token, TokenKind::Refresh)?;
        self.sign(
            &claims.user_id,
            &claims.tenant_id,
            &claims.email,
            claims.roles,
            TokenKind::Access,
        )
    }

    /// Decode and check a token of the expected kind, returning its claims.
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run below against the injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidAlgorithm => debug!("token rejected: algorithm not allowed"),
                    ErrorKind::InvalidSignature => debug!("token rejected: bad signature"),
                    _ => debug!(error = %e, "token rejected: malformed"),
                }
                AuthError::InvalidToken
            })?
            .claims;

        if claims.typ != expected {
            debug!(expected = ?expected, found = ?claims.typ, "token rejected: wrong kind");
            return Err(AuthError::InvalidToken);
        }
        if claims.user_id.is_empty() {
            debug!("token rejected: empty user_id");
            return Err(AuthError::InvalidToken);
        }
        if !(claims.nbf <= claims.iat && claims.iat <= claims.exp) {
            debug!(
                nbf = claims.nbf,
                iat = claims.iat,
                exp = claims.exp,
                "token rejected: inconsistent time claims"
            );
            return Err(AuthError::InvalidToken);
        }

        let now = self.clock.now();
        if now < claims.nbf {
            debug!(now, nbf = claims.nbf, "token rejected: not yet valid");
            return Err(AuthError::InvalidToken);
        }
        if now > claims.exp {
            debug!(now, exp = claims.exp, "token rejected: expired");
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }

    fn sign(
        &self,
        user_id: &str,
        tenant_id: &str,
        email: &str,
        roles: Vec<String>,
        typ: TokenKind,
    ) -> Result<String, AuthError> {
        let now = self.clock.now();
        let ttl = match typ {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| AuthError::Signing(format!("expiry overflows: now {now} + ttl {ttl}")))?;
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            email: email.to_string(),
            roles,
            typ,
            iat: now,
            nbf: now,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }
}
