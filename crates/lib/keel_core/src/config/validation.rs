//! Settings validation, run once after all layers are applied.

use super::{ConfigError, MAX_TTL_SECS, Settings};

impl Settings {
    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;
        if auth.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret is required (set KEEL_JWT_SECRET)".into(),
            ));
        }
        if auth.access_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "auth.access_ttl_secs must be positive, got {}",
                auth.access_ttl_secs
            )));
        }
        if auth.refresh_ttl_secs < auth.access_ttl_secs {
            return Err(ConfigError::Invalid(format!(
                "auth.refresh_ttl_secs ({}) must not be shorter than auth.access_ttl_secs ({})",
                auth.refresh_ttl_secs, auth.access_ttl_secs
            )));
        }

        if auth.refresh_ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth TTLs must not exceed {MAX_TTL_SECS} seconds, got {}",
                auth.refresh_ttl_secs
            )));
        }

        let tls = &self.tls;
        let set = [&tls.cert_path, &tls.key_path, &tls.ca_path]
            .iter()
            .filter(|p| p.is_some())
            .count();
        if set != 0 && set != 3 {
            return Err(ConfigError::Invalid(
                "tls requires cert_path, key_path and ca_path together".into(),
            ));
        }

        if self.log.level.trim().is_empty() {
            return Err(ConfigError::Invalid("log.level must not be empty".into()));
        }
        Ok(())
    }
}
