//! Layered settings resolution: defaults → YAML file → environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::{ConfigError, Settings};

/// Environment variable naming the YAML settings file.
pub const ENV_CONFIG_PATH: &str = "KEEL_CONFIG";

/// Resolve settings from the process environment.
///
/// | Variable                | Overrides                 |
/// |-------------------------|---------------------------|
/// | `KEEL_CONFIG`           | settings file path        |
/// | `KEEL_SERVICE_NAME`     | `service.name`            |
/// | `KEEL_ENVIRONMENT`      | `service.environment`     |
/// | `KEEL_BIND_ADDR`        | `service.bind_addr`       |
/// | `KEEL_LOG_LEVEL`        | `log.level`               |
/// | `KEEL_LOG_FORMAT`       | `log.format`              |
/// | `KEEL_JWT_SECRET`       | `auth.jwt_secret`         |
/// | `KEEL_ACCESS_TTL_SECS`  | `auth.access_ttl_secs`    |
/// | `KEEL_REFRESH_TTL_SECS` | `auth.refresh_ttl_secs`   |
/// | `KEEL_TLS_CERT`         | `tls.cert_path`           |
/// | `KEEL_TLS_KEY`          | `tls.key_path`            |
/// | `KEEL_TLS_CA`           | `tls.ca_path`             |
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Like [`load`], with an explicit environment lookup.
pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|v| !v.is_empty());

    let file = path
        .map(Path::to_path_buf)
        .or_else(|| env(ENV_CONFIG_PATH).map(PathBuf::from));

    let mut settings = match file {
        Some(path) => from_file(&path)?,
        None => Settings::default(),
    };

    apply_env(&mut settings, &env)?;
    settings.validate()?;
    Ok(settings)
}

/// Parse a YAML settings file. Missing keys keep their defaults.
pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded settings file");
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(settings: &mut Settings, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("KEEL_SERVICE_NAME") {
        settings.service.name = v;
    }
    if let Some(v) = env("KEEL_ENVIRONMENT") {
        settings.service.environment = v;
    }
    if let Some(v) = env("KEEL_BIND_ADDR") {
        settings.service.bind_addr = v;
    }
    if let Some(v) = env("KEEL_LOG_LEVEL") {
        settings.log.level = v;
    }
    if let Some(v) = env("KEEL_LOG_FORMAT") {
        settings.log.format = v.parse()?;
    }
    if let Some(v) = env("KEEL_JWT_SECRET") {
        settings.auth.jwt_secret = v;
    }
    if let Some(v) = env("KEEL_ACCESS_TTL_SECS") {
        settings.auth.access_ttl_secs = parse_number("KEEL_ACCESS_TTL_SECS", &v)?;
    }
    if let Some(v) = env("KEEL_REFRESH_TTL_SECS") {
        settings.auth.refresh_ttl_secs = parse_number("KEEL_REFRESH_TTL_SECS", &v)?;
    }
    if let Some(v) = env("KEEL_TLS_CERT") {
        settings.tls.cert_path = Some(v.into());
    }
    if let Some(v) = env("KEEL_TLS_KEY") {
        settings.tls.key_path = Some(v.into());
    }
    if let Some(v) = env("KEEL_TLS_CA") {
        settings.tls.ca_path = Some(v.into());
    }
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be an integer, got '{value}'")))
}
