//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default pipeline settings.
    pub pipeline: PipelineConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters for one transform-and-republish pipeline.
///
/// Interaction/mount surfaces and transport collaborators are not part of
/// this struct; they are handed to the pipeline separately at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output surface width in pixels.
    pub width: u32,

    /// Output surface height in pixels.
    pub height: u32,

    /// Target frame rate for acquisition hints and the output stream.
    pub fps: u32,

    /// Lower zoom bound.
    pub min_zoom: f64,

    /// Upper zoom bound.
    pub max_zoom: f64,

    /// Zoom at start. Clamped into `[min_zoom, max_zoom]`; `None` means 1.0.
    pub initial_zoom: Option<f64>,

    /// Fill color drawn before each blit (`#rgb`, `#rrggbb`, `#rrggbbaa`).
    /// `None` clears the surface to transparent instead.
    pub background: Option<String>,

    /// Only every Nth display refresh renders a frame.
    pub render_every_n_frames: u32,

    /// Verbose per-pipeline diagnostics.
    pub debug: bool,

    /// Logical publication slot the output is bound to.
    pub slot_name: String,

    /// Track name used when a new publication has to be created.
    pub track_name: String,

    /// Request simulcast layers for new publications.
    pub simulcast: bool,

    /// Multiplicative zoom step per modified wheel notch.
    pub wheel_step: f64,

    /// Poll period while waiting for source metadata (milliseconds).
    pub metadata_poll_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lenscast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            min_zoom: 1.0,
            max_zoom: 4.0,
            initial_zoom: None,
            background: Some("#000".to_string()),
            render_every_n_frames: 1,
            debug: false,
            slot_name: "camera".to_string(),
            track_name: "camera-upscaled".to_string(),
            simulcast: true,
            wheel_step: 1.1,
            metadata_poll_ms: 30,
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

impl PipelineConfig {
    /// Return a copy with out-of-range values repaired.
    ///
    /// A non-positive minimum zoom becomes 1, a maximum below the minimum
    /// becomes `max(min, 4)`, and sizes/rates get their lower bounds.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        if !(out.min_zoom > 0.0) || !out.min_zoom.is_finite() {
            out.min_zoom = 1.0;
        }
        if !(out.max_zoom >= out.min_zoom) || !out.max_zoom.is_finite() {
            out.max_zoom = out.min_zoom.max(4.0);
        }
        out.width = out.width.max(2);
        out.height = out.height.max(2);
        out.fps = out.fps.max(1);
        out.render_every_n_frames = out.render_every_n_frames.max(1);
        if !(out.wheel_step > 1.0) || !out.wheel_step.is_finite() {
            out.wheel_step = 1.1;
        }
        out.metadata_poll_ms = out.metadata_poll_ms.max(1);
        out
    }

    /// Starting zoom, clamped into the configured bounds.
    pub fn effective_initial_zoom(&self) -> f64 {
        let zoom = self.initial_zoom.filter(|z| z.is_finite()).unwrap_or(1.0);
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
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
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
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
    base.join("lenscast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_repairs_zoom_bounds() {
        let config = PipelineConfig {
            min_zoom: -2.0,
            max_zoom: 0.5,
            width: 0,
            height: 1,
            render_every_n_frames: 0,
            ..PipelineConfig::default()
        }
        .normalized();

        assert_eq!(config.min_zoom, 1.0);
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.width, 2);
        assert_eq!(config.height, 2);
        assert_eq!(config.render_every_n_frames, 1);
    }

    #[test]
    fn normalization_keeps_large_minimum() {
        let config = PipelineConfig {
            min_zoom: 6.0,
            max_zoom: 2.0,
            ..PipelineConfig::default()
        }
        .normalized();
        assert_eq!(config.max_zoom, 6.0);
    }

    #[test]
    fn initial_zoom_is_clamped() {
        let config = PipelineConfig {
            initial_zoom: Some(9.0),
            ..PipelineConfig::default()
        };
        assert_eq!(config.effective_initial_zoom(), 4.0);
        assert_eq!(PipelineConfig::default().effective_initial_zoom(), 1.0);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"fps": 24, "background": null}}"#).unwrap();
        assert_eq!(config.pipeline.fps, 24);
        assert_eq!(config.pipeline.width, 1280);
        assert!(config.pipeline.background.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_from_missing_file_falls_back() {
        let path = std::env::temp_dir().join("lenscast-config-test-missing.json");
        let _ = std::fs::remove_file(&path);
        let config = AppConfig::load_from(&path);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn save_and_load_round_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("lenscast-config-{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = AppConfig::default();
        config.pipeline.max_zoom = 8.0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.pipeline.max_zoom, 8.0);
        let _ = std::fs::remove_dir_all(dir);
    }
}
