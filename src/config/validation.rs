//! Configuration error type and loading helpers.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Configuration error types.
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
}

impl ConfigError {
    /// Fold a list of validation problems into one error, if there are any.
    pub(crate) fn from_problems(problems: Vec<String>) -> Result<(), Self> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self::ValidationError(problems.join("; ")))
        }
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references in raw config text.
///
/// Expansion happens before YAML parsing, so substituted text is parsed as
/// YAML. Quote references whose value may be empty or contain YAML syntax
/// (`password: "${SENSOR_PASSWORD}"`). An unset variable without a default
/// expands to nothing. `$${` is written out as a literal `${`.
pub fn expand_env_vars(input: &str) -> String {
    static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$(\$)?\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    REFERENCE
        .replace_all(input, |caps: &Captures| {
            if caps.get(1).is_some() {
                return caps[0][1..].to_string();
            }
            let default = caps.get(3).map_or("", |m| m.as_str());
            std::env::var(&caps[2]).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_problems_empty_is_ok() {
        assert!(ConfigError::from_problems(Vec::new()).is_ok());
    }

    #[test]
    fn test_from_problems_joins_messages() {
        let err = ConfigError::from_problems(vec![
            "global: scrape_interval must be greater than 0".to_string(),
            "server: endpoint is required".to_string(),
        ])
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("scrape_interval must be greater than 0"));
        assert!(msg.contains("; server: endpoint is required"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Credentials {
        username: String,
        password: String,
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("address: 10.0.0.7"), "address: 10.0.0.7");
    }

    #[test]
    fn test_expand_env_vars_default_keeps_separators() {
        let result = expand_env_vars("address: ${NONEXISTENT_EXPORTER_HOST_98765:-10.0.0.7:8080/temp}");
        assert_eq!(result, "address: 10.0.0.7:8080/temp");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: only this test touches this variable.
        unsafe {
            std::env::set_var("TEST_EXPORTER_SENSOR_HOST", "sensor.lan");
        }
        let result = expand_env_vars("address: ${TEST_EXPORTER_SENSOR_HOST}/temp");
        assert_eq!(result, "address: sensor.lan/temp");
        // SAFETY: as above.
        unsafe {
            std::env::remove_var("TEST_EXPORTER_SENSOR_HOST");
        }
    }

    #[test]
    fn test_escaped_reference_is_literal() {
        let result = expand_env_vars("password: \"p$${NOT_A_VAR}w\"");
        assert_eq!(result, "password: \"p${NOT_A_VAR}w\"");
    }

    #[test]
    fn test_quoted_unset_password_decodes_empty() {
        let yaml = expand_env_vars(
            "username: \"${NONEXISTENT_EXPORTER_USER_98765:-admin}\"\npassword: \"${NONEXISTENT_EXPORTER_PASSWORD_98765}\"\n",
        );
        let credentials: Credentials = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.password, "");
    }

    #[test]
    fn test_quoted_default_with_yaml_characters() {
        let yaml = expand_env_vars(
            "username: admin\npassword: \"${NONEXISTENT_EXPORTER_PASSWORD_98765:-s3cr#t: x}\"\n",
        );
        let credentials: Credentials = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(credentials.password, "s3cr#t: x");
    }
}
