//! Configuration for wadispatch

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults applied to new campaign drafts
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend project (e.g. https://xyz.example.co)
    pub url: Option<String>,

    /// Public API key, sent as the `apikey` header
    pub api_key: Option<String>,

    /// User access token; falls back to the API key when absent
    pub access_token: Option<String>,

    /// Identity of the signed-in user
    pub user_id: Option<Uuid>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Prefix shared by every table and procedure name
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            access_token: None,
            user_id: None,
            timeout_secs: default_timeout(),
            table_prefix: default_table_prefix(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_table_prefix() -> String {
    "wa_dispatcher_v4_".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Defaults for new campaign drafts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Column of the linked sheet that holds the contact id
    #[serde(default = "default_sheet_id_column")]
    pub sheet_id_column: String,

    #[serde(default = "default_min_delay")]
    pub min_delay_seconds: u32,

    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u32,

    #[serde(default = "default_pause_after")]
    pub pause_after_messages: u32,

    #[serde(default = "default_pause_duration")]
    pub pause_duration_seconds: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sheet_id_column: default_sheet_id_column(),
            min_delay_seconds: default_min_delay(),
            max_delay_seconds: default_max_delay(),
            pause_after_messages: default_pause_after(),
            pause_duration_seconds: default_pause_duration(),
        }
    }
}

fn default_sheet_id_column() -> String {
    "ID".to_string()
}

fn default_min_delay() -> u32 {
    5
}

fn default_max_delay() -> u32 {
    10
}

fn default_pause_after() -> u32 {
    50
}

fn default_pause_duration() -> u32 {
    300
}

/// Environment variable prefix, e.g. `WADISPATCH__BACKEND__URL`
const ENV_PREFIX: &str = "WADISPATCH";

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the first file found in the default
    /// locations, overlaid with `WADISPATCH__*` environment variables
    pub fn load() -> crate::Result<Self> {
        let paths = [
            PathBuf::from("./wadispatch.toml"),
            PathBuf::from("/etc/wadispatch/config.toml"),
        ];

        let file = paths.into_iter().find(|path| path.exists());
        Self::load_layered(file.as_deref())
    }

    /// Load configuration from an optional file plus the environment
    pub fn load_layered(file: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|settings| settings.try_deserialize::<Config>())
            .map_err(|e| crate::Error::Config(format!("Failed to load config: {}", e)))
    }
}
