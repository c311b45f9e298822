//! gst-launch pipeline description
//!
//! Builds the command line that parses raw frames from stdin and renders them.
//! The `videoparse` caps must match the producer's buffer exactly: the stream
//! has no header, so a geometry mismatch shows up as a sheared image.

use crate::config::StreamConfig;
use crate::formats::PixelFormat;

/// Launcher binary
pub const GST_LAUNCH: &str = "gst-launch-1.0";

/// A gst-launch pipeline reading raw frames from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GstPipeline {
    /// Input frame width
    pub width: u32,
    /// Input frame height
    pub height: u32,
    /// Input pixel format
    pub format: PixelFormat,
    /// Frames per second declared to videoparse and videorate
    pub fps: u32,
    /// Optional converter after videoparse
    pub converter: Option<String>,
    /// Output window width
    pub output_width: u32,
    /// Output window height
    pub output_height: u32,
    /// Display sink element
    pub display_sink: String,
}

impl GstPipeline {
    /// Pipeline matching the stream configuration
    pub fn from_config(config: &StreamConfig) -> Self {
        let (output_width, output_height) = config.output_size();
        Self {
            width: config.geometry.width,
            height: config.geometry.height,
            format: config.geometry.format,
            fps: config.fps,
            converter: config.sink.converter.clone(),
            output_width,
            output_height,
            display_sink: config.sink.display_sink.clone(),
        }
    }

    /// Pipeline elements, in order, joined with `!` by [`Self::description`]
    pub fn elements(&self) -> Vec<String> {
        let mut elements = vec![
            "fdsrc".to_string(),
            format!(
                "videoparse width={} height={} format={} framerate={}/1",
                self.width,
                self.height,
                self.format.gst_name(),
                self.fps
            ),
        ];

        if let Some(converter) = &self.converter {
            elements.push(converter.clone());
        }

        elements.push("videoscale".to_string());
        elements.push(format!(
            "video/x-raw,width={},height={}",
            self.output_width, self.output_height
        ));
        elements.push("videoconvert".to_string());
        elements.push("videorate".to_string());
        elements.push(format!("video/x-raw,framerate={}/1", self.fps));
        elements.push(format!(
            "{} window-width={} window-height={} sync=false",
            self.display_sink, self.output_width, self.output_height
        ));

        elements
    }

    /// Pipeline description as gst-launch expects it
    pub fn description(&self) -> String {
        self.elements().join(" ! ")
    }

    /// Full shell command line
    ///
    /// `exec` replaces the shell so signals sent to the child reach gst-launch.
    pub fn command_line(&self) -> String {
        format!("exec {} {}", GST_LAUNCH, self.description())
    }
}

impl std::fmt::Display for GstPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", GST_LAUNCH, self.description())
    }
}

/// Shell command that the sink process runs for this configuration
pub fn sink_command_line(config: &StreamConfig) -> String {
    match &config.sink.command {
        Some(command) => command.clone(),
        None => GstPipeline::from_config(config).command_line(),
    }
}

/// Check whether gst-launch-1.0 is on PATH
pub fn gst_launch_available() -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(GST_LAUNCH).is_file()))
        .unwrap_or(false)
}
