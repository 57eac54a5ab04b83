//! MeterHub Settings
//!
//! Application configuration for the telemetry hub.
//!
//! ## Features
//!
//! - Server settings (listen address, heartbeat interval)
//! - Batch sizing (size threshold, delay, buffer bound)
//! - Database pool settings
//! - JSON serialization with per-field defaults

mod config;

pub use config::{BatchSettings, DatabaseSettings, ServerSettings, Settings};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Get the default settings file path.
///
/// `METERHUB_SETTINGS` overrides it; otherwise the platform config dir.
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("METERHUB_SETTINGS") {
        return PathBuf::from(path);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|_| PathBuf::from("."));
    base.join("meterhub").join("settings.json")
}
