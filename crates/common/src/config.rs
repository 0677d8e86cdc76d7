//! User defaults.
//!
//! An optional JSON file supplies defaults for the command-line surface.
//! Command-line flags always win over anything loaded here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted defaults for rendering and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Default rendering parameters.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Frames per second.
    pub fps: u32,

    /// Output width in pixels (0 = source width).
    pub width: u32,

    /// FourCC codec identifier.
    pub codec: String,

    /// Output container extension.
    pub container: String,

    /// Allowed image extensions (lowercase, without dot).
    pub extensions: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "folderlapse=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: 24,
            width: 1280,
            codec: "mp4v".to_string(),
            container: "mp4".to_string(),
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Defaults {
    /// Load defaults from the standard location, falling back to built-ins.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load defaults from a specific file, falling back to built-ins.
    ///
    /// A missing file is silent; an unreadable or malformed one is logged.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(defaults) => return defaults,
                    Err(e) => {
                        tracing::warn!("Failed to parse defaults at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read defaults at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard defaults file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("folderlapse").join("config.json")
}
