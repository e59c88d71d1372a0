use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming the config file used by the server.
pub const CONFIG_ENV_VAR: &str = "PDF_SUITE_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads the file named by `PDF_SUITE_CONFIG`, or returns defaults when unset.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            log::info!("Loading configuration from {}", path);
            load_config(path)
        }
        _ => {
            log::info!("{} not set, using default configuration", CONFIG_ENV_VAR);
            Ok(Config::default())
        }
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config.batch.timeout_seconds == 0 || config.conversion.timeout_seconds == 0 {
        return Err(ConfigError::Validation {
            message: "timeouts must be greater than zero".to_string(),
        });
    }

    if !(72..=1200).contains(&config.ocr.dpi) {
        return Err(ConfigError::Validation {
            message: format!("OCR dpi {} out of range (72-1200)", config.ocr.dpi),
        });
    }

    if config.site_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "site_directory must not be empty".to_string(),
        });
    }

    Ok(())
}
