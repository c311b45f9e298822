//! Configuration types for fbpipe
//!
//! Provides the stream configuration (device, capture region, frame rate),
//! the sink pipeline settings and their compiled-in defaults.

mod file;

pub use file::{ConfigFile, sample_config};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FbpipeError, Result};
use crate::formats::PixelFormat;
use crate::types::{CrtcSelect, FrameGeometry, Origin};

/// DRM device opened by default
pub const DEFAULT_DEVICE: &str = "/dev/dri/card1";
/// Capture width in pixels
pub const DEFAULT_WIDTH: u32 = 640;
/// Capture height in pixels
pub const DEFAULT_HEIGHT: u32 = 480;
/// Horizontal offset of the capture region
pub const DEFAULT_X_OFFSET: u32 = 100;
/// Vertical offset of the capture region
pub const DEFAULT_Y_OFFSET: u32 = 100;
/// Target frames per second
pub const DEFAULT_FPS: u32 = 25;
/// Hardware color/scale converter inserted before `videoscale`
pub const DEFAULT_CONVERTER: &str = "imxvideoconvert_g2d";
/// Display sink element
pub const DEFAULT_DISPLAY_SINK: &str = "waylandsink";
/// How long the sink gets to exit after SIGTERM before it is killed
pub const DEFAULT_TERMINATE_TIMEOUT_MS: u64 = 2000;

/// Settings for the external rendering pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Converter element after `videoparse` (None = skip)
    pub converter: Option<String>,
    /// Display sink element
    pub display_sink: String,
    /// Output window size (None = same as capture)
    pub output_size: Option<(u32, u32)>,
    /// Full shell command replacing the generated gst-launch pipeline
    pub command: Option<String>,
    /// Grace period between SIGTERM and SIGKILL
    pub terminate_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            converter: Some(DEFAULT_CONVERTER.to_string()),
            display_sink: DEFAULT_DISPLAY_SINK.to_string(),
            output_size: None,
            command: None,
            terminate_timeout: Duration::from_millis(DEFAULT_TERMINATE_TIMEOUT_MS),
        }
    }
}

/// Full configuration for one capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// DRM device node
    pub device: PathBuf,
    /// CRTC to capture from
    pub crtc: CrtcSelect,
    /// Explicit path to the native capture library
    pub library: Option<PathBuf>,
    /// Captured frame size and pixel format
    pub geometry: FrameGeometry,
    /// Top-left corner of the capture region
    pub origin: Origin,
    /// Target frames per second
    pub fps: u32,
    /// Stop cleanly after this many frames
    pub max_frames: Option<u64>,
    /// Sink pipeline settings
    pub sink: SinkConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            crtc: CrtcSelect::Auto,
            library: None,
            geometry: FrameGeometry::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, PixelFormat::Bgra),
            origin: Origin::new(DEFAULT_X_OFFSET, DEFAULT_Y_OFFSET),
            fps: DEFAULT_FPS,
            max_frames: None,
            sink: SinkConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Set the DRM device
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the CRTC selection
    pub fn with_crtc(mut self, crtc: CrtcSelect) -> Self {
        self.crtc = crtc;
        self
    }

    /// Set the native library path
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    /// Set capture size, keeping the pixel format
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.geometry.width = width;
        self.geometry.height = height;
        self
    }

    /// Set the pixel format
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.geometry.format = format;
        self
    }

    /// Set the capture region origin
    pub fn with_origin(mut self, x: u32, y: u32) -> Self {
        self.origin = Origin::new(x, y);
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Stop after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Replace the generated sink pipeline with a shell command
    pub fn with_sink_command(mut self, command: impl Into<String>) -> Self {
        self.sink.command = Some(command.into());
        self
    }

    /// Set the sink grace period after SIGTERM
    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.sink.terminate_timeout = timeout;
        self
    }

    /// Bytes in one frame
    pub fn frame_size(&self) -> Result<usize> {
        self.geometry.frame_size()
    }

    /// Sleep between cycles, `1 / fps`
    ///
    /// Capture and write time is not subtracted, so the delivered rate is at
    /// most the target rate.
    pub fn frame_interval(&self) -> Duration {
        if self.fps == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(1_000_000_000 / u64::from(self.fps))
    }

    /// Window size of the display sink
    pub fn output_size(&self) -> (u32, u32) {
        self.sink
            .output_size
            .unwrap_or((self.geometry.width, self.geometry.height))
    }

    /// Validate the configuration and return any warnings
    ///
    /// An empty list means the configuration looks good.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.fps > 60 {
            warnings.push(format!(
                "{}fps is above what sleep-based pacing holds reliably; expect a lower delivered rate",
                self.fps
            ));
        }

        let bytes_per_second = self
            .frame_size()
            .map(|s| s as u64 * self.fps as u64)
            .unwrap_or(0);
        if bytes_per_second > 500_000_000 {
            warnings.push(format!(
                "{} at {}fps is {} MB/s through a pipe; the sink may not keep up",
                self.geometry,
                self.fps,
                bytes_per_second / 1_000_000
            ));
        }

        if self.sink.command.is_none() && self.sink.converter.is_none() {
            warnings.push(
                "No converter element configured; videoconvert will do all color conversion in software"
                    .to_string(),
            );
        }

        warnings
    }

    /// Validate and return an error if the configuration cannot work
    pub fn validate_strict(&self) -> Result<()> {
        self.frame_size()?;

        if self.fps == 0 {
            return Err(FbpipeError::config("Framerate cannot be zero"));
        }

        if self.geometry.width > 7680 || self.geometry.height > 4320 {
            return Err(FbpipeError::config(format!(
                "Resolution {}x{} exceeds maximum supported (7680x4320)",
                self.geometry.width, self.geometry.height
            )));
        }

        if i32::try_from(self.origin.x.saturating_add(self.geometry.width)).is_err()
            || i32::try_from(self.origin.y.saturating_add(self.geometry.height)).is_err()
        {
            return Err(FbpipeError::config(format!(
                "Capture region at {} is out of range",
                self.origin
            )));
        }

        if let Some((w, h)) = self.sink.output_size {
            if w == 0 || h == 0 {
                return Err(FbpipeError::config("Output size cannot be zero"));
            }
        }

        if self.max_frames == Some(0) {
            return Err(FbpipeError::config("Frame limit cannot be zero"));
        }

        if self.sink.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(FbpipeError::config("Sink command cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.device, PathBuf::from("/dev/dri/card1"));
        assert_eq!(config.crtc, CrtcSelect::Auto);
        assert_eq!(config.geometry.width, 640);
        assert_eq!(config.geometry.height, 480);
        assert_eq!(config.geometry.pixel_size(), 4);
        assert_eq!(config.origin, Origin::new(100, 100));
        assert_eq!(config.fps, 25);
        assert!(config.validate_strict().is_ok());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_frame_interval() {
        let config = StreamConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_millis(40));

        let config = StreamConfig::default().with_fps(50);
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let config = StreamConfig::default().with_fps(0);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_zero_size_rejected() {
        let config = StreamConfig::default().with_size(0, 480);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_output_size_defaults_to_capture() {
        let config = StreamConfig::default().with_size(320, 240);
        assert_eq!(config.output_size(), (320, 240));
    }

    #[test]
    fn test_high_fps_warns() {
        let config = StreamConfig::default().with_fps(120);
        assert!(config.validate().iter().any(|w| w.contains("120fps")));
    }
}
