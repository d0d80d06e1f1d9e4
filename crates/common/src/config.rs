//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline configuration file; built-in defaults are used when absent.
    #[serde(default)]
    pub pipeline_config: Option<PathBuf>,

    /// Default render surface settings.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default render surface parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDefaults {
    /// Render tick rate (Hz) at which the pipeline is updated.
    pub tick_hz: u32,

    /// Canvas size in pixels.
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Video source size in pixels (used for the aspect fit).
    pub source_width: u32,
    pub source_height: u32,

    /// Mirror the feed horizontally (front-facing cameras).
    pub mirror: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "posetrace_tracking_core=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline_config: None,
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            canvas_width: 1280,
            canvas_height: 720,
            source_width: 640,
            source_height: 480,
            mirror: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("posetrace").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_json_roundtrip_keeps_render_defaults() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.render.tick_hz, 60);
        assert!(parsed.render.mirror);
        assert!(parsed.pipeline_config.is_none());
    }

    #[test]
    fn test_pipeline_config_path_is_optional_in_file() {
        let raw = r#"{
            "render": {
                "tick_hz": 30,
                "canvas_width": 800,
                "canvas_height": 600,
                "source_width": 640,
                "source_height": 480,
                "mirror": false
            },
            "logging": { "level": "debug", "json": true, "file": null }
        }"#;
        let parsed: AppConfig = serde_json::from_str(raw).unwrap();
        assert!(parsed.pipeline_config.is_none());
        assert_eq!(parsed.render.tick_hz, 30);
        assert!(parsed.logging.json);
    }
}
