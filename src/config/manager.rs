use crate::config::validation::ConfigValidator;
use crate::config::Config;
use crate::utils::errors::{HostError, HostResult};
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for environment overrides, e.g. `MCPHOST_HEALTH__INTERVAL_SECS=10`
pub const ENV_PREFIX: &str = "MCPHOST_";

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            Some("yml") | Some("yaml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Loads the host configuration from a file layered with environment overrides
pub struct ConfigManager {
    path: PathBuf,
    format: ConfigFormat,
    config: Config,
}

impl ConfigManager {
    /// Load and validate the config at `path` (`~` is expanded).
    pub fn load(path: impl AsRef<str>) -> HostResult<Self> {
        let path = PathBuf::from(shellexpand::tilde(path.as_ref()).to_string());
        if !path.exists() {
            return Err(HostError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let format = ConfigFormat::from_path(&path);
        debug!("Detected config format: {:?}", format);

        let config = Self::figment(&path, format).extract::<Config>()?;

        ConfigValidator::new().validate(&config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            HostError::Config(joined)
        })?;

        info!(
            "Loaded config from {} ({} providers)",
            path.display(),
            config.providers.len()
        );

        Ok(Self {
            path,
            format,
            config,
        })
    }

    fn figment(path: &Path, format: ConfigFormat) -> Figment {
        let base = Figment::from(Serialized::defaults(Config::default()));
        let base = match format {
            ConfigFormat::Toml => base.merge(Toml::file(path)),
            ConfigFormat::Yaml => base.merge(Yaml::file(path)),
            ConfigFormat::Json => base.merge(Json::file(path)),
        };
        base.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]))
    }

    pub fn get_config(&self) -> Config {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }
}
