//! Configuration validation using JSON Schema

use crate::config::manager::ConfigFormat;
use crate::config::Config;
use crate::core::naming::SEPARATOR;
use schemars::schema_for;
use serde_json::Value;
use std::collections::HashSet;
use validator::Validate;

/// Validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Configuration validator
pub struct ConfigValidator {
    schema: Value,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let schema = schema_for!(Config);
        Self {
            schema: serde_json::to_value(&schema).unwrap_or_default(),
        }
    }

    /// JSON Schema for the configuration
    pub fn get_schema(&self) -> &Value {
        &self.schema
    }

    pub fn export_schema(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_default()
    }

    /// Parse and validate raw config content
    pub fn validate_str(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> Result<Config, Vec<ValidationError>> {
        let parsed: Result<Config, String> = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };

        let config = parsed.map_err(|e| {
            vec![ValidationError {
                path: "root".to_string(),
                message: format!("{:?} parse error: {}", format, e),
            }]
        })?;

        self.validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self, config: &Config) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.validate_providers(config, &mut errors);
        self.validate_intervals(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_providers(&self, config: &Config, errors: &mut Vec<ValidationError>) {
        let mut names = HashSet::new();

        for (idx, provider) in config.providers.iter().enumerate() {
            if let Err(validation_errors) = provider.validate() {
                for (field, field_errors) in validation_errors.field_errors() {
                    for error in field_errors {
                        errors.push(ValidationError {
                            path: format!("providers[{}].{}", idx, field),
                            message: error
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| error.code.to_string()),
                        });
                    }
                }
            }

            if provider.name.contains(SEPARATOR) {
                errors.push(ValidationError {
                    path: format!("providers[{}].name", idx),
                    message: format!(
                        "Provider name must not contain '{}': {}",
                        SEPARATOR, provider.name
                    ),
                });
            }

            if !provider.name.is_empty() && !names.insert(provider.name.as_str()) {
                errors.push(ValidationError {
                    path: format!("providers[{}].name", idx),
                    message: format!("Duplicate provider name: {}", provider.name),
                });
            }
        }
    }

    fn validate_intervals(&self, config: &Config, errors: &mut Vec<ValidationError>) {
        if config.health.interval_secs == 0 {
            errors.push(ValidationError {
                path: "health.interval_secs".to_string(),
                message: "Health check interval must be greater than zero".to_string(),
            });
        }
        if config.transport.request_timeout_secs == 0 {
            errors.push(ValidationError {
                path: "transport.request_timeout_secs".to_string(),
                message: "Request timeout must be greater than zero".to_string(),
            });
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
