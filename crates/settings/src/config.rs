//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{default_settings_path, Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Batch sizing
    #[serde(default)]
    pub batch: BatchSettings,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Custom settings file path (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            batch: BatchSettings::default(),
            database: DatabaseSettings::default(),
            config_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default path, or create defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
            let mut settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            settings.config_path = Some(path.clone());
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.clone());
            Ok(settings)
        }
    }

    /// Save settings to the configured path
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.clone().unwrap_or_else(default_settings_path);
        self.save_to(&path)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the WebSocket server listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Heartbeat ping interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8585".to_string()
}

fn default_heartbeat_interval() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

/// Batch sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Flush as soon as this many events are buffered
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Flush once the oldest buffered event is this old (0 disables the
    /// time trigger)
    #[serde(default)]
    pub max_delay_ms: u64,

    /// Hard bound on the shared buffer; events beyond it are shed
    #[serde(default = "default_max_buffered")]
    pub max_buffered: usize,
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_max_buffered() -> usize {
    8000
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_delay_ms: 0,
            max_buffered: default_max_buffered(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a pooled connection before failing the call
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://meterhub@localhost/meterhub".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}
