//! Framebuffer capture sources
//!
//! This module handles:
//! - The native DRM capture library (`DrmCapture`)
//! - A synthetic test pattern for running without a display (`TestPattern`)
//!
//! Both implement [`FrameSource`], the lifecycle the capture loop drives:
//! initialize, set the format, capture any number of frames, clean up.

pub mod drm;
pub mod drm_sys;
pub mod pattern;

pub use drm::DrmCapture;
pub use pattern::TestPattern;

use std::path::Path;

use crate::error::Result;
use crate::types::{CrtcSelect, FrameBuffer, FrameGeometry, Origin};

/// A source of raw frames
///
/// Implementations own whatever state sits behind the capture. The session
/// guarantees the call order: `initialize`, then `set_format`, then
/// `capture_frame` repeatedly, then `cleanup` exactly once if `initialize`
/// succeeded.
pub trait FrameSource {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Open the device and select a CRTC
    fn initialize(&mut self, device: &Path, crtc: CrtcSelect) -> Result<()>;

    /// Declare the geometry of every following capture
    fn set_format(&mut self, geometry: FrameGeometry) -> Result<()>;

    /// Overwrite `buffer` with the region starting at `origin`
    fn capture_frame(&mut self, buffer: &mut FrameBuffer, origin: Origin) -> Result<()>;

    /// Release everything acquired by `initialize`
    fn cleanup(&mut self);
}

/// List DRM card nodes under `/dev/dri`
pub fn list_devices() -> Vec<String> {
    let mut devices: Vec<String> = std::fs::read_dir("/dev/dri")
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("card"))
                .map(|e| e.path().display().to_string())
                .collect()
        })
        .unwrap_or_default();
    devices.sort();
    devices
}
