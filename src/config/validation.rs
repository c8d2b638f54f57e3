//! Configuration errors and parsing utilities.

use std::time::Duration;

use thiserror::Error;

use crate::metric::MetricError;

/// Configuration error types.
///
/// Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// Two probes were registered under the same name.
    #[error("duplicate probe name: '{0}'")]
    DuplicateProbe(String),

    /// A probe toggle names a probe that is not registered.
    #[error("unknown probe: '{0}'")]
    UnknownProbe(String),

    /// A metric descriptor could not be built.
    #[error("invalid metric descriptor: {0}")]
    Metric(#[from] MetricError),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `30s`, `1m`, `5m30s`, `1h`, `100ms`, etc.
///
/// # Examples
///
/// ```
/// use dbscrape::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// assert_eq!(parse_duration("1m30s").unwrap().as_secs(), 90);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration(" 250ms ").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_err());
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(
            expand_env_vars("mysql://exporter@127.0.0.1:3306/"),
            "mysql://exporter@127.0.0.1:3306/"
        );
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let result = expand_env_vars("mysql://exporter:${NONEXISTENT_DBSCRAPE_PW_12345:-secret}@db/");
        assert_eq!(result, "mysql://exporter:secret@db/");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: This test runs in isolation and only modifies a test-specific variable.
        unsafe {
            std::env::set_var("DBSCRAPE_TEST_EXPAND_HOST", "db.internal");
        }
        let result = expand_env_vars("mysql://exporter@${DBSCRAPE_TEST_EXPAND_HOST}:3306/");
        assert_eq!(result, "mysql://exporter@db.internal:3306/");
        // SAFETY: Cleanup test variable.
        unsafe {
            std::env::remove_var("DBSCRAPE_TEST_EXPAND_HOST");
        }
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::DuplicateProbe("info_schema.tablestats".into()).to_string(),
            "duplicate probe name: 'info_schema.tablestats'"
        );
        let err = ConfigError::from(MetricError::InvalidName("1x".into()));
        assert!(err.to_string().contains("invalid metric name"));
    }
}
