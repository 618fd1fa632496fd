//! Config loading tests

use mcphost::config::{ConfigFormat, ConfigManager, ConfigValidator, LogFormat};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, file: &str, content: &str) -> String {
    let path = dir.path().join(file);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_load_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(
        &temp_dir,
        "config.toml",
        r#"
[client]
name = "multi-server-client"
version = "0.1.0"

[transport]
request_timeout_secs = 15

[logging]
level = "debug"
format = "json"

[llm]
model = "qwen2.5"

[[providers]]
name = "server1"
endpoint = "http://localhost:9292/sse"

[[providers]]
name = "server2"
endpoint = "http://localhost:9293/sse"
enabled = false
"#,
    );

    let manager = ConfigManager::load(&path).unwrap();
    let config = manager.get_config();

    assert_eq!(manager.format(), ConfigFormat::Toml);
    assert_eq!(config.client.name, "multi-server-client");
    assert_eq!(config.transport.request_timeout_secs, 15);
    assert_eq!(config.transport.connect_timeout_secs, 10);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.llm.resolved_model(), "qwen2.5");

    assert_eq!(config.providers.len(), 2);
    assert!(config.providers[0].enabled);
    assert!(!config.providers[1].enabled);
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(
        &temp_dir,
        "config.json",
        r#"{"providers": [{"name": "calc", "endpoint": "http://localhost:8080/sse"}]}"#,
    );

    let config = ConfigManager::load(&path).unwrap().get_config();
    assert_eq!(config.providers[0].name, "calc");
    assert_eq!(config.client.name, "mcphost");
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let result = ConfigManager::load(path.to_string_lossy());
    assert!(result.is_err());
}

#[test]
fn test_load_rejects_invalid_providers() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(
        &temp_dir,
        "config.toml",
        r#"
[[providers]]
name = "calc@home"
endpoint = "http://localhost:8080/sse"

[[providers]]
name = "calc@home"
endpoint = "http://localhost:8081/sse"
"#,
    );

    let err = ConfigManager::load(&path).err().unwrap();
    let message = err.to_string();
    assert!(message.contains("must not contain '@'"));
    assert!(message.contains("Duplicate provider name"));
}

#[test]
fn test_validate_str_reports_parse_errors() {
    let errors = ConfigValidator::new()
        .validate_str("[[providers]\nname = ", ConfigFormat::Toml)
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, "root");
}

#[test]
fn test_schema_lists_sections() {
    let validator = ConfigValidator::new();
    let properties = validator.get_schema()["properties"].as_object().unwrap();

    for section in ["client", "transport", "health", "logging", "llm", "providers"] {
        assert!(properties.contains_key(section), "missing {}", section);
    }
}
