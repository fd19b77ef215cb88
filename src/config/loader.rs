//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::validation::{validate_config, ValidationError};
use super::IntrospectorConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration document without validating it.
pub fn parse_config(content: &str) -> Result<IntrospectorConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<IntrospectorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        api_key = "secret"
        environment = "production"

        [reporting]
        endpoint = "https://collector.example.com/v1/reports"
    "#;

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert!(config.enabled);
        assert_eq!(config.service_name, None);
        assert_eq!(config.reporting.batch_size, 10);
        assert_eq!(config.reporting.batch_interval_secs, 5);
        assert_eq!(config.reporting.ping_interval_secs, 300);
        assert_eq!(config.interception.sample_rate, 1.0);
        assert_eq!(config.interception.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.proxy.upstream, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            api_key = "k"
            environment = "dev"
            service_name = "billing"
            enabled = false

            [reporting]
            endpoint = "http://localhost:9999/reports"
            batch_size = 0
            timeout_secs = 3

            [interception]
            sample_rate = 0.25
            exclude_path_prefixes = ["/health", "/metrics"]

            [observability]
            json_logs = true
            "#,
        )
        .unwrap();
        assert_eq!(config.service_name.as_deref(), Some("billing"));
        assert!(!config.enabled);
        assert_eq!(config.reporting.batch_size, 0);
        assert_eq!(config.interception.exclude_path_prefixes.len(), 2);
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("introspector-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "environment = \"dev\"\n").unwrap();
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().starts_with("Validation failed: api_key must not be empty"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("api_key = "), Err(ConfigError::Parse(_))));
    }
}
