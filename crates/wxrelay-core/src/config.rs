use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AppError, ConfigError};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WXRELAY_CONFIG";

const LISTEN_ADDR_ENV: &str = "LISTEN_ADDR";
const LISTEN_PORT_ENV: &str = "LISTEN_PORT";
const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
const API_KEY_ENV: &str = "API_KEY";
const API_ENDPOINT_ENV: &str = "API_ENDPOINT";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Attempts made to open the store at startup
    #[serde(default = "default_open_retries")]
    pub open_retries: u32,

    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxrelay")
        .join("weather.db")
}

fn default_open_retries() -> u32 {
    10
}

fn default_retry_interval_secs() -> u64 {
    2
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            open_retries: default_open_retries(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenWeather-compatible API, without the `/weather` path
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Upper bound on a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_endpoint() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    ///
    /// A file named by `WXRELAY_CONFIG` must exist; the default location may not.
    pub fn load() -> Result<Self, AppError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.trim().is_empty() => {
                let path = PathBuf::from(p.trim());
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()).into());
                }
                Self::load_from(&path)?
            }
            _ => match Self::default_config_path() {
                Some(path) => Self::load_from(&path)?,
                None => {
                    tracing::debug!("No config directory on this platform, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides(std::env::vars());
        Ok(config)
    }

    /// Load configuration and validate it.
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult), AppError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;

        toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", path.display(), e.message())).into()
        })
    }

    /// Override file settings with any of the recognised environment variables.
    pub fn apply_env_overrides<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        if let Some(addr) = env.get(LISTEN_ADDR_ENV) {
            self.server.listen_addr = addr.trim().to_string();
        }
        if let Some(port) = env.get(LISTEN_PORT_ENV) {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.listen_port = p,
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", LISTEN_PORT_ENV, port),
            }
        }
        if let Some(path) = env.get(DATABASE_PATH_ENV) {
            self.store.database_path = PathBuf::from(path.trim());
        }
        if let Some(key) = env.get(API_KEY_ENV) {
            self.provider.api_key = key.trim().to_string();
        }
        if let Some(endpoint) = env.get(API_ENDPOINT_ENV) {
            self.provider.api_endpoint = endpoint.trim().to_string();
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.provider.api_endpoint, "provider.api_endpoint", &mut result);

        if self.provider.api_key.is_empty() {
            result.add_warning(
                "provider.api_key",
                "No API key configured - provider requests will be rejected",
            );
        }

        if self.provider.timeout_secs == 0 {
            result.add_error("provider.timeout_secs", "Timeout must be greater than 0");
        } else if self.provider.timeout_secs > 120 {
            result.add_warning(
                "provider.timeout_secs",
                "Provider timeout is unusually long (>120s)",
            );
        }

        if self.server.listen_port == 0 {
            result.add_warning("server.listen_port", "Port 0 binds an ephemeral port");
        }

        if self.store.open_retries == 0 {
            result.add_error("store.open_retries", "At least one open attempt is required");
        }

        if self.store.database_path.as_os_str().is_empty() {
            result.add_error("store.database_path", "Database path cannot be empty");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wxrelay").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_default_config_is_valid_with_key_warning() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.iter().any(|w| w.field == "provider.api_key"));
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let mut config = Config::default();
        config.provider.api_endpoint = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "provider.api_endpoint"));
    }

    #[test]
    fn test_invalid_endpoint_scheme() {
        let mut config = Config::default();
        config.provider.api_endpoint = "ftp://weather.example".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = Config::default();
        config.provider.timeout_secs = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_env_overrides_replace_file_values() {
        let mut config = Config::default();
        config.apply_env_overrides(vec![
            ("LISTEN_ADDR", "127.0.0.1"),
            ("LISTEN_PORT", "9000"),
            ("API_KEY", "secret"),
            ("API_ENDPOINT", "http://localhost:7000"),
            ("DATABASE_PATH", "/tmp/wx.db"),
        ]);

        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.provider.api_key, "secret");
        assert_eq!(config.provider.api_endpoint, "http://localhost:7000");
        assert_eq!(config.store.database_path, PathBuf::from("/tmp/wx.db"));
    }

    #[test]
    fn test_env_override_ignores_bad_port_and_blank_values() {
        let mut config = Config::default();
        config.apply_env_overrides(vec![("LISTEN_PORT", "not-a-port"), ("API_KEY", "  ")]);
        assert_eq!(config.server.listen_port, 8080);
        assert!(config.provider.api_key.is_empty());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.listen_port, 8080);
    }

    #[test]
    fn test_load_from_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[provider]\napi_key = \"abc\"\ntimeout_secs = 3\n\n[server]\nlisten_addr = \"127.0.0.1\"\nlisten_port = 8081\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.api_key, "abc");
        assert_eq!(config.provider.timeout_secs, 3);
        assert_eq!(config.provider.api_endpoint, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.server.listen_port, 8081);
        assert_eq!(config.store.open_retries, 10);
    }

    #[test]
    fn test_load_from_malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nlisten_port = \"eighty\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
