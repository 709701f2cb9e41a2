//! Configuration module
//!
//! Handles loading and saving robolink configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::DEFAULT_COMMAND_PORT;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Robot endpoint settings
    #[serde(default)]
    pub robot: RobotConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Human-readable name for this operator station
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            verbose: false,
            log_file: None,
        }
    }
}

/// Robot endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Robot host name or address
    #[serde(default = "default_host")]
    pub host: String,
    /// Command channel port
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    /// Video channel port. Defaults to the command port when unset;
    /// the two ports are otherwise independent.
    pub video_port: Option<u16>,
}

fn default_host() -> String {
    "192.168.4.1".to_string()
}

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            command_port: default_command_port(),
            video_port: None,
        }
    }
}

impl RobotConfig {
    /// Effective video port
    pub fn video_port(&self) -> u16 {
        self.video_port.unwrap_or(self.command_port)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("robolink/config.toml")),
            Some(PathBuf::from("./robolink.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    let config = Config {
        general: GeneralConfig {
            name: "operator-laptop".to_string(),
            verbose: false,
            log_file: None,
        },
        robot: RobotConfig {
            host: "192.168.4.1".to_string(),
            command_port: DEFAULT_COMMAND_PORT,
            video_port: Some(DEFAULT_COMMAND_PORT + 1),
        },
    };

    toml::to_string_pretty(&config).unwrap()
}
