//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reporting service configuration
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Time box for each chart dataset request
    #[serde(default = "default_dataset_timeout")]
    pub dataset_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_dataset_timeout() -> u64 {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: String::new(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: default_request_timeout(),
            dataset_timeout_secs: default_dataset_timeout(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("dataset_timeout_secs", &self.dataset_timeout_secs)
            .finish()
    }
}

/// Chart preference storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "default_prefs_dir")]
    pub dir: String,
}

fn default_prefs_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("tripboard").to_string_lossy().to_string())
        .unwrap_or_else(|| "./tripboard_data".to_string())
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            dir: default_prefs_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tripboard").join("config.toml")),
            Some(PathBuf::from("./tripboard.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(url) = lookup("TRIPBOARD_API_URL") {
            self.api.base_url = url;
        }
        if let Some(user_id) = lookup("TRIPBOARD_USER_ID") {
            self.api.user_id = user_id;
        }
        if let Some(username) = lookup("TRIPBOARD_USERNAME") {
            self.api.username = username;
        }
        if let Some(password) = lookup("TRIPBOARD_PASSWORD") {
            self.api.password = password;
        }

        // Preference overrides
        if let Some(dir) = lookup("TRIPBOARD_PREFS_DIR") {
            self.preferences.dir = dir;
        }

        // Logging overrides
        if let Some(level) = lookup("TRIPBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TRIPBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Tripboard Configuration
#
# Environment variables override these settings:
# - TRIPBOARD_API_URL
# - TRIPBOARD_USER_ID
# - TRIPBOARD_USERNAME
# - TRIPBOARD_PASSWORD
# - TRIPBOARD_PREFS_DIR
# - TRIPBOARD_LOG_LEVEL
# - TRIPBOARD_LOG_FORMAT

[api]
# Reporting service base URL
base_url = "http://localhost:8080"

# Credentials sent with every request
user_id = ""
username = ""
password = ""

# HTTP request timeout in seconds
request_timeout_secs = 30

# Time box for each chart dataset request (seconds)
dataset_timeout_secs = 20

[preferences]
# Directory holding chart order and visibility
dir = "~/.local/share/tripboard"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
