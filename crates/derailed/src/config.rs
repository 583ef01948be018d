//! Configuration management for the Derailed CLI.
//!
//! The configuration lives in a TOML file inside the data directory. It is
//! created by `derailed setup` and updated by `register` and `logout`.

use crate::error::AppError;
use crate::paths::DataPaths;
use derailed_gateway::{GatewayConfig, ProxyConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Valid values for `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_log_level() -> String {
    "info".to_string()
}

/// Persisted CLI state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session token returned by registration
    #[serde(default)]
    pub token: Option<String>,
    /// Config format version
    #[serde(default)]
    pub version: u32,
    /// Service endpoints
    pub urls: UrlSettings,
    /// Optional HTTP proxy for both the API and the gateway
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Endpoints given to `derailed setup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSettings {
    /// REST API base URL, e.g. `https://api.derailed.example`
    pub api: String,
    /// Gateway WebSocket URL, e.g. `wss://gateway.derailed.example`
    pub gateway: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// A fresh configuration as written by `derailed setup`.
    pub fn new(api_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            token: None,
            version: 0,
            urls: UrlSettings {
                api: api_url.into(),
                gateway: gateway_url.into(),
            },
            proxy: None,
            logging: LoggingSettings::default(),
        }
    }

    /// Reads the configuration from the data directory.
    ///
    /// Fails with [`AppError::NotSetUp`] when the directory or the file is
    /// missing.
    pub async fn load(paths: &DataPaths) -> Result<Self, AppError> {
        let path = paths.config_file();
        if !paths.is_set_up() || !path.is_file() {
            return Err(AppError::NotSetUp);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration into an existing data directory.
    pub async fn save(&self, paths: &DataPaths) -> Result<(), AppError> {
        if !paths.is_set_up() {
            return Err(AppError::NotSetUp);
        }

        let path = paths.config_file();
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(&path, content).await?;
        info!("💾 Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validates configuration settings.
    pub fn validate(&self) -> Result<(), String> {
        let api = self.urls.api.as_str();
        if !(api.starts_with("http://") || api.starts_with("https://")) {
            return Err(format!("API URL must be http(s): {api}"));
        }

        self.gateway_config()
            .validate()
            .map_err(|e| format!("Invalid gateway URL: {e}"))?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }

    /// Gateway connection settings derived from this configuration.
    pub fn gateway_config(&self) -> GatewayConfig {
        let config = GatewayConfig::new(self.urls.gateway.clone());
        match &self.proxy {
            Some(proxy) => config.with_proxy(proxy.clone()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig::new("http://localhost:8000", "ws://localhost:9000/gateway")
    }

    #[test]
    fn fresh_config_has_no_token() {
        let config = sample();
        assert_eq!(config.token, None);
        assert_eq!(config.version, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = sample();
        config.urls.api = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.urls.gateway = "http://localhost:9000".to_string();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [urls]
            api = "http://localhost:8000"
            gateway = "ws://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.token, None);
        assert_eq!(config.logging, LoggingSettings::default());
        assert!(config.proxy.is_none());
    }

    #[test]
    fn proxy_is_passed_to_gateway_config() {
        let mut config = sample();
        config.proxy = Some(ProxyConfig::new("proxy.local", 3128));

        let gateway = config.gateway_config();
        assert_eq!(gateway.uri, "ws://localhost:9000/gateway");
        assert_eq!(gateway.proxy, Some(ProxyConfig::new("proxy.local", 3128)));
    }

    #[tokio::test]
    async fn save_then_load_preserves_token() {
        let temp = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(temp.path());

        let mut config = sample();
        config.token = Some("secret".to_string());
        config.save(&paths).await.unwrap();

        let loaded = AppConfig::load(&paths).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn missing_directory_is_not_set_up() {
        let temp = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(temp.path().join("missing"));

        assert!(matches!(AppConfig::load(&paths).await, Err(AppError::NotSetUp)));
        assert!(matches!(sample().save(&paths).await, Err(AppError::NotSetUp)));
    }
}
