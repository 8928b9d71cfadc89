use std::path::Path;

use crate::config::schema::AnalysisConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<AnalysisConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: AnalysisConfig = serde_json::from_value(json_value)?;

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

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &AnalysisConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !(config.frame_interval_secs.is_finite() && config.frame_interval_secs > 0.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "frame_interval_secs must be positive, got {}",
                config.frame_interval_secs
            ),
        });
    }

    let thresholds = [
        ("echo_similarity", config.thresholds.echo_similarity),
        ("match_ratio", config.thresholds.match_ratio),
        ("partial_overlap", config.thresholds.partial_overlap),
    ];
    for (name, value) in thresholds {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::Validation {
                message: format!("Threshold '{}' must be in (0, 1], got {}", name, value),
            });
        }
    }

    if config.validation.echo_markers.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one echo marker is required".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.frame_interval_secs, 2.0);
        assert_eq!(config.validation.max_retries, 2);
        assert_eq!(config.progress.min_samples, 3);
        assert_eq!(config.thresholds.partial_overlap, 0.5);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = load_config_from_str(
            r#"{
                "ollama": { "model": "llava:13b" },
                "thresholds": { "match_ratio": 0.7 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.ollama.model, "llava:13b");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.thresholds.match_ratio, 0.7);
        assert_eq!(config.thresholds.echo_similarity, 0.8);
    }

    #[test]
    fn test_unknown_field_rejected_by_schema() {
        let result = load_config_from_str(r#"{ "frame_rate": 5 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_zero_retries_allowed() {
        let config = load_config_from_str(r#"{ "validation": { "max_retries": 0 } }"#).unwrap();
        assert_eq!(config.validation.max_retries, 0);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let result = load_config_from_str(r#"{ "thresholds": { "partial_overlap": 1.5 } }"#);
        match result {
            Err(ConfigError::Validation { message }) => {
                assert!(message.contains("partial_overlap"));
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json_error() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "frame_interval_secs": 1.0 }}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.frame_interval_secs, 1.0);
    }

    #[test]
    fn test_missing_file_error() {
        let result = load_config("/nonexistent/vidspell.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
