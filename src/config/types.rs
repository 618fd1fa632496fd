use crate::core::naming::SEPARATOR;
use crate::utils::errors::{HostError, HostResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Identity this host presents in the initialize handshake
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "mcphost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout for provider calls
    pub request_timeout_secs: u64,
    /// How long to wait for a provider to announce its message endpoint
    pub connect_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .or_else(|| std::env::var("OPENAI_MODEL_NAME").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()))
    }
}

/// A remote tool provider. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ProviderConfig {
    /// Unique key; also the suffix of every composite tool name
    #[validate(length(min = 1, message = "provider name must not be empty"))]
    pub name: String,
    /// SSE endpoint URL
    #[validate(length(min = 1, message = "provider endpoint must not be empty"))]
    pub endpoint: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Checks applied before a provider enters the registry.
    pub fn check(&self) -> HostResult<()> {
        if let Err(errors) = self.validate() {
            return Err(HostError::InvalidConfig(format!("{}: {}", self.name, errors)));
        }
        if self.name.contains(SEPARATOR) {
            return Err(HostError::InvalidConfig(format!(
                "provider name '{}' must not contain '{}'",
                self.name, SEPARATOR
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.client.name, "mcphost");
        assert_eq!(config.health.interval_secs, 30);
        assert!(config.health.enabled);
        assert_eq!(config.transport.request_timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_provider_enabled_defaults_to_true() {
        let provider: ProviderConfig =
            toml::from_str("name = \"calc\"\nendpoint = \"http://localhost:9293/sse\"").unwrap();
        assert!(provider.enabled);
    }

    #[test]
    fn test_provider_check() {
        assert!(ProviderConfig::new("calc", "http://localhost:9293/sse").check().is_ok());
        assert!(matches!(
            ProviderConfig::new("", "http://localhost:9293/sse").check(),
            Err(HostError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProviderConfig::new("calc", "").check(),
            Err(HostError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProviderConfig::new("my@calc", "http://localhost:9293/sse").check(),
            Err(HostError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_llm_explicit_values_win() {
        let llm = LlmConfig {
            base_url: Some("http://localhost:8080/v1".to_string()),
            model: Some("local-model".to_string()),
            api_key: Some("sk-test".to_string()),
            timeout_secs: 5,
        };
        assert_eq!(llm.resolved_base_url(), "http://localhost:8080/v1");
        assert_eq!(llm.resolved_model(), "local-model");
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-test"));
    }
}
