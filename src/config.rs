use crate::core::{Result, SqlGateError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "SQLGATE_CONFIG";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
}

/// Connection settings handed to `init`.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Registered driver name
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Driver-specific connection parameters
    pub connection_string: String,
    /// Upper bound on connection attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_driver() -> String {
    "sqlite".to_string()
}

fn default_max_retries() -> u32 {
    5
}

impl Config {
    /// Parses configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SqlGateError::Config(e.to_string()))
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = sqlgate::config::load_config("sqlgate.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| SqlGateError::Config(format!("{}: {}", path.display(), e)))?;
    Config::from_toml_str(&content)
}

/// Configuration file location: `$SQLGATE_CONFIG`, else
/// `<config dir>/sqlgate/config.toml`
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("sqlgate").join("config.toml"))
}
