//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline interaction defaults.
    pub editor: EditorDefaults,

    /// Render and job-management settings.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Defaults for the interactive timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Distance (pixels) under which a dragged edge snaps to a candidate.
    pub snap_threshold_px: f64,

    /// Rate (Hz) at which live gesture updates reach the project model.
    pub live_update_hz: u32,

    /// Maximum undo (and redo) depth.
    pub history_limit: usize,

    /// Shortest duration a resize may leave a clip with (seconds).
    pub min_clip_duration_secs: f64,

    /// Initial timeline zoom (pixels per second).
    pub default_zoom: f64,
}

/// Render pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// FFmpeg binary to invoke.
    pub ffmpeg_path: String,

    /// Name of the job-scoped temp directory inside a project.
    pub temp_dir_name: String,

    /// Name of the directory persisted renders are moved into.
    pub renders_dir_name: String,

    /// Directory holding `<font>.ttf` files for text overlays.
    pub fonts_dir: PathBuf,

    /// How often callers poll a running job (milliseconds).
    pub poll_interval_ms: u64,

    /// Attempts made to delete a busy temp file before giving up.
    pub delete_max_attempts: u32,

    /// Base backoff between delete attempts (milliseconds, multiplied by attempt).
    pub delete_backoff_ms: u64,

    /// Wait after terminating the renderer before deleting its files (milliseconds).
    pub kill_grace_ms: u64,

    /// Number of log lines returned with a processing status.
    pub log_tail_lines: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            editor: EditorDefaults::default(),
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            snap_threshold_px: 10.0,
            live_update_hz: 60,
            history_limit: 50,
            min_clip_duration_secs: 0.1,
            default_zoom: 100.0,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            temp_dir_name: ".tmp".to_string(),
            renders_dir_name: "renders".to_string(),
            fonts_dir: dirs_default_fonts(),
            poll_interval_ms: 2000,
            delete_max_attempts: 5,
            delete_backoff_ms: 1000,
            kill_grace_ms: 2000,
            log_tail_lines: 20,
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
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutline").join("config.json")
}

/// Default fonts directory.
fn dirs_default_fonts() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("cutline").join("fonts")
}
