//! Tracing subscriber setup shared by service binaries.

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LogFormat, LogSettings};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Logs go to stderr so
/// stdout stays free for program output.
pub fn init(settings: &LogSettings) -> Result<(), ConfigError> {
    let filter = filter(settings)?;
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    let result = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    result.map_err(|e| ConfigError::Invalid(format!("logging already initialised: {e}")))
}

/// Build the filter `init` would install.
pub fn filter(settings: &LogSettings) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level)
        .map_err(|e| ConfigError::Invalid(format!("log.level '{}': {e}", settings.level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directive_lists() {
        let settings = LogSettings {
            level: "info,keel_api=debug".into(),
            format: LogFormat::Compact,
        };
        assert!(filter(&settings).is_ok());
    }

    #[test]
    fn second_init_fails_cleanly() {
        let settings = LogSettings::default();
        let _ = init(&settings);
        assert!(init(&settings).is_err());
    }
}
