//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/fbpipe/config.toml`. Every field is
//! optional; anything left out keeps the compiled-in default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    DEFAULT_CONVERTER, DEFAULT_DEVICE, DEFAULT_DISPLAY_SINK, DEFAULT_FPS, DEFAULT_HEIGHT,
    DEFAULT_TERMINATE_TIMEOUT_MS, DEFAULT_WIDTH, DEFAULT_X_OFFSET, DEFAULT_Y_OFFSET, StreamConfig,
};
use crate::error::{FbpipeError, Result};
use crate::formats::PixelFormat;
use crate::types::{CrtcSelect, FrameGeometry, Origin};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// DRM device settings
    #[serde(default)]
    pub device: DeviceSettings,

    /// Capture region settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Sink pipeline settings
    #[serde(default)]
    pub sink: SinkSettings,
}

/// DRM device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Device node
    #[serde(default = "default_device")]
    pub path: String,

    /// CRTC index, negative = first active CRTC
    #[serde(default = "default_crtc")]
    pub crtc: i64,

    /// Native capture library path (empty = search standard paths)
    #[serde(default)]
    pub library: String,
}

/// Capture region settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Pixel format (bgra, bgrx, rgba, rgbx, rgb, bgr)
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_x_offset")]
    pub x_offset: u32,

    #[serde(default = "default_y_offset")]
    pub y_offset: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,
}

/// Sink pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Converter element (empty = none)
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Display sink element
    #[serde(default = "default_display_sink")]
    pub display_sink: String,

    /// Output window width (0 = capture width)
    #[serde(default)]
    pub output_width: u32,

    /// Output window height (0 = capture height)
    #[serde(default)]
    pub output_height: u32,

    /// Full shell command replacing the generated pipeline (empty = generate)
    #[serde(default)]
    pub command: String,

    /// Milliseconds between SIGTERM and SIGKILL
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_crtc() -> i64 {
    -1
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_format() -> String {
    "bgra".to_string()
}

fn default_x_offset() -> u32 {
    DEFAULT_X_OFFSET
}

fn default_y_offset() -> u32 {
    DEFAULT_Y_OFFSET
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_converter() -> String {
    DEFAULT_CONVERTER.to_string()
}

fn default_display_sink() -> String {
    DEFAULT_DISPLAY_SINK.to_string()
}

fn default_terminate_timeout_ms() -> u64 {
    DEFAULT_TERMINATE_TIMEOUT_MS
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            path: default_device(),
            crtc: default_crtc(),
            library: String::new(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: default_format(),
            x_offset: default_x_offset(),
            y_offset: default_y_offset(),
            fps: default_fps(),
        }
    }
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            converter: default_converter(),
            display_sink: default_display_sink(),
            output_width: 0,
            output_height: 0,
            command: String::new(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
        }
    }
}

fn write_config(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FbpipeError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }
    }

    std::fs::write(path, content)
        .map_err(|e| FbpipeError::Config(format!("Failed to write config file: {}", e)))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("fbpipe").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("fbpipe")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/fbpipe/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| FbpipeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        write_config(&path, &self.to_toml()?)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write the commented sample configuration to `path`
    pub fn save_sample_to(path: PathBuf) -> Result<()> {
        write_config(&path, &sample_config())?;
        info!("Wrote sample configuration to {:?}", path);
        Ok(())
    }

    /// Serialize with every default filled in
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FbpipeError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Resolve into a stream configuration
    ///
    /// Only checks what the file alone decides (format name, paired output
    /// size). Range checks belong to [`StreamConfig::validate_strict`], run
    /// once every override has been applied.
    pub fn to_stream_config(&self) -> Result<StreamConfig> {
        let format: PixelFormat = self
            .capture
            .format
            .parse()
            .map_err(FbpipeError::Config)?;

        let mut config = StreamConfig {
            device: PathBuf::from(&self.device.path),
            crtc: CrtcSelect::from_flag(self.device.crtc),
            library: non_empty(&self.device.library).map(PathBuf::from),
            geometry: FrameGeometry::new(self.capture.width, self.capture.height, format),
            origin: Origin::new(self.capture.x_offset, self.capture.y_offset),
            fps: self.capture.fps,
            ..StreamConfig::default()
        };

        config.sink.converter = non_empty(&self.sink.converter);
        config.sink.display_sink = non_empty(&self.sink.display_sink)
            .ok_or_else(|| FbpipeError::config("sink.display_sink cannot be empty"))?;
        config.sink.command = non_empty(&self.sink.command);
        config.sink.terminate_timeout = Duration::from_millis(self.sink.terminate_timeout_ms);
        config.sink.output_size = match (self.sink.output_width, self.sink.output_height) {
            (0, 0) => None,
            (0, _) | (_, 0) => {
                return Err(FbpipeError::config(
                    "sink.output_width and sink.output_height must be set together",
                ));
            }
            (w, h) => Some((w, h)),
        };

        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# fbpipe Configuration

[device]
# DRM device node
path = "/dev/dri/card1"

# CRTC index to capture; -1 picks the first CRTC with a framebuffer
crtc = -1

# Native capture library; empty searches ./libdrm.so and libdrmcapture.so
library = ""

[capture]
# Region size in pixels
width = 640
height = 480

# Pixel format: bgra, bgrx, rgba, rgbx, rgb, bgr
format = "bgra"

# Top-left corner of the region inside the framebuffer
x_offset = 100
y_offset = 100

# Target frames per second (sleep-paced)
fps = 25

[sink]
# Hardware converter element; empty to skip
converter = "imxvideoconvert_g2d"

# Display sink element
display_sink = "waylandsink"

# Output window size; 0 uses the capture size
output_width = 0
output_height = 0

# Full shell command to use instead of the generated gst-launch pipeline
command = ""

# Milliseconds the sink gets to exit after SIGTERM
terminate_timeout_ms = 2000
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.device.path, "/dev/dri/card1");
        assert_eq!(config.capture.format, "bgra");
        assert_eq!(config.sink.converter, "imxvideoconvert_g2d");
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = sample_config();
        let config: ConfigFile = toml::from_str(&sample).unwrap();
        assert_eq!(config.capture.fps, 25);
        assert_eq!(config.device.crtc, -1);
    }

    #[test]
    fn test_sample_matches_compiled_defaults() {
        let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
        assert_eq!(config.to_stream_config().unwrap(), StreamConfig::default());
    }
}
