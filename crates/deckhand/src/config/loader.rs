use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SUPPORTED_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the config at `path`, or the defaults when no file is given or the
/// file does not exist.
pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    match path {
        Some(path) if path.as_ref().exists() => load_config(path),
        Some(path) => {
            log::info!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.bind.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "bind address must not be empty".to_string(),
        });
    }

    if config.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_jobs must be greater than 0".to_string(),
        });
    }

    if config.notifier_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "notifier_capacity must be greater than 0".to_string(),
        });
    }

    if config.retrieval.chunk_size_words == 0 {
        return Err(ConfigError::Validation {
            message: "retrieval.chunk_size_words must be greater than 0".to_string(),
        });
    }

    if let Some(endpoint) = &config.naming.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation {
                message: format!("naming.endpoint must be an http(s) URL: {}", endpoint),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.bind, "0.0.0.0:8001");
        assert_eq!(config.upload_directory, "uploads");
        assert_eq!(config.output_directory, "outputs");
        assert_eq!(config.notifier_capacity, 256);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.max_concurrent_jobs > 0);
        assert_eq!(config.naming.model, "llama3.2");
        assert_eq!(config.retrieval.chunk_size_words, 200);
        assert_eq!(config.retrieval.context_results, 3);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_full_config() {
        let json = r#"{
            "version": "1.0",
            "bind": "127.0.0.1:9000",
            "max_concurrent_jobs": 2,
            "naming": {
                "endpoint": "http://localhost:11434/v1",
                "model": "qwen2.5",
                "api_key_env": "NAMING_API_KEY",
                "timeout_secs": 5
            },
            "logging": { "level": "debug", "format": "json" }
        }"#;

        let config = load_config_from_str(json).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(
            config.naming.endpoint.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.naming.timeout_secs, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unsupported_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_limits_rejected() {
        for json in [
            r#"{"max_concurrent_jobs": 0}"#,
            r#"{"notifier_capacity": 0}"#,
            r#"{"retrieval": {"chunk_size_words": 0}}"#,
            r#"{"bind": "  "}"#,
        ] {
            let result = load_config_from_str(json);
            assert!(
                matches!(result, Err(ConfigError::Validation { .. })),
                "expected validation error for {}",
                json
            );
        }
    }

    #[test]
    fn test_endpoint_must_be_http() {
        let result = load_config_from_str(r#"{"naming": {"endpoint": "ftp://host"}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"upload_directory": "/tmp/in"}}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upload_directory, "/tmp/in");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(Some(dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8001");

        let config = load_or_default::<&Path>(None).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let result = load_config("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
