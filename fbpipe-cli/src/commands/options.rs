//! Stream options shared by `stream` and `info`
//!
//! Precedence: compiled-in defaults, then the config file, then these flags.

use anyhow::{Context, Result, anyhow};
use clap::Args;
use fbpipe_core::config::{ConfigFile, StreamConfig};
use fbpipe_core::types::CrtcSelect;
use fbpipe_core::PixelFormat;
use std::path::PathBuf;

/// Overrides for the stream configuration
#[derive(Args, Debug, Default)]
pub struct StreamOptions {
    /// Config file to read instead of ~/.config/fbpipe/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// DRM device node (e.g., /dev/dri/card1)
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// CRTC index to capture, -1 for the first active one
    #[arg(long, allow_negative_numbers = true)]
    pub crtc: Option<i64>,

    /// Path to the native capture library
    #[arg(long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Capture width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Capture height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Pixel format (bgra, bgrx, rgba, rgbx, rgb, bgr)
    #[arg(long)]
    pub format: Option<String>,

    /// Horizontal offset of the capture region
    #[arg(short = 'x', long = "x-offset")]
    pub x_offset: Option<u32>,

    /// Vertical offset of the capture region
    #[arg(short = 'y', long = "y-offset")]
    pub y_offset: Option<u32>,

    /// Target frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Converter element inserted after videoparse
    #[arg(long, conflicts_with = "no_converter")]
    pub converter: Option<String>,

    /// Skip the converter element
    #[arg(long)]
    pub no_converter: bool,

    /// Display sink element (e.g., waylandsink, autovideosink)
    #[arg(long)]
    pub display_sink: Option<String>,

    /// Shell command to run instead of the generated gst-launch pipeline
    #[arg(long)]
    pub sink_command: Option<String>,
}

impl StreamOptions {
    /// Build the stream configuration from defaults, config file and flags
    pub fn resolve(&self) -> Result<StreamConfig> {
        let file = match &self.config {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("Config file not found: {}", path.display()));
                }
                ConfigFile::load_from(path.clone())?
            }
            None => ConfigFile::load_or_default(),
        };

        let mut config = file
            .to_stream_config()
            .context("Invalid configuration file")?;

        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(crtc) = self.crtc {
            config.crtc = CrtcSelect::from_flag(crtc);
        }
        if let Some(library) = &self.library {
            config.library = Some(library.clone());
        }
        if let Some(width) = self.width {
            config.geometry.width = width;
        }
        if let Some(height) = self.height {
            config.geometry.height = height;
        }
        if let Some(format) = &self.format {
            config.geometry.format = format.parse::<PixelFormat>().map_err(|e| {
                anyhow!("{}. Valid options: bgra, bgrx, rgba, rgbx, rgb, bgr", e)
            })?;
        }
        if let Some(x) = self.x_offset {
            config.origin.x = x;
        }
        if let Some(y) = self.y_offset {
            config.origin.y = y;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if self.no_converter {
            config.sink.converter = None;
        } else if let Some(converter) = &self.converter {
            config.sink.converter = Some(converter.clone());
        }
        if let Some(display_sink) = &self.display_sink {
            config.sink.display_sink = display_sink.clone();
        }
        if let Some(command) = &self.sink_command {
            config.sink.command = Some(command.clone());
        }

        config.validate_strict()?;
        Ok(config)
    }
}

/// Print the configuration block shown by `stream` and `info`
pub fn print_config(config: &StreamConfig) {
    println!("Configuration:");
    println!("  Device:      {}", config.device.display());
    println!("  CRTC:        {}", config.crtc);
    println!(
        "  Library:     {}",
        config
            .library
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(search standard paths)".to_string())
    );
    println!("  Region:      {} at {}", config.geometry, config.origin);
    println!(
        "  Frame size:  {} bytes",
        config.frame_size().unwrap_or_default()
    );
    println!(
        "  Framerate:   {} fps ({:?} per frame)",
        config.fps,
        config.frame_interval()
    );
    if let Some(max) = config.max_frames {
        println!("  Frame limit: {}", max);
    }
    println!();
}
