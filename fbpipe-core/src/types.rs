//! Core types for fbpipe
//!
//! Geometry of the captured region and the frame buffer that carries one
//! frame from the capture library to the sink.

use serde::{Deserialize, Serialize};

use crate::error::{FbpipeError, Result};
use crate::formats::PixelFormat;

/// Size and pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel byte order
    pub format: PixelFormat,
}

impl FrameGeometry {
    /// Create a new geometry
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    /// Bytes per pixel
    pub fn pixel_size(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * self.pixel_size() as usize
    }

    /// Total bytes in one frame (`width * height * pixel_size`)
    ///
    /// Fails if either dimension is zero or the size overflows `usize`.
    pub fn frame_size(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(FbpipeError::config(format!(
                "Frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(self.pixel_size() as usize))
            .ok_or_else(|| {
                FbpipeError::config(format!(
                    "Frame {}x{} is too large",
                    self.width, self.height
                ))
            })
    }
}

impl std::fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.format)
    }
}

/// Top-left corner of the capture region inside the source framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Origin {
    /// Horizontal offset in pixels
    pub x: u32,
    /// Vertical offset in pixels
    pub y: u32,
}

impl Origin {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Which CRTC the capture library should read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrtcSelect {
    /// First CRTC with an attached framebuffer
    #[default]
    Auto,
    /// Fixed index into the device's CRTC list
    Index(u32),
}

impl CrtcSelect {
    /// Flag value passed to the native initialize call (`-1` means auto)
    pub fn as_flag(&self) -> i32 {
        match self {
            Self::Auto => -1,
            Self::Index(i) => i32::try_from(*i).unwrap_or(i32::MAX),
        }
    }

    /// Parse the native flag convention: negative means auto
    pub fn from_flag(flag: i64) -> Self {
        match u32::try_from(flag) {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Auto,
        }
    }
}

impl std::fmt::Display for CrtcSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One frame worth of pixel bytes, reused for every capture
///
/// The length is fixed at `width * height * pixel_size` for the lifetime of
/// the buffer, so a capture can always write the whole region in place.
#[derive(Debug)]
pub struct FrameBuffer {
    geometry: FrameGeometry,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for the given geometry
    pub fn new(geometry: FrameGeometry) -> Result<Self> {
        let size = geometry.frame_size()?;
        Ok(Self {
            geometry,
            data: vec![0u8; size],
        })
    }

    /// Geometry this buffer was allocated for
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Frame bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable frame bytes for a capture to overwrite
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Borrow one row of pixels
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.geometry.height {
            return None;
        }
        let stride = self.geometry.stride();
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }
}
