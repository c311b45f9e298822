//! Pixel format constants and conversions
//!
//! Maps the byte order of the frames we emit to the names used by DRM
//! (fourcc codes) and by GStreamer (`videoparse format=`).

use serde::{Deserialize, Serialize};

/// DRM format fourcc constants
///
/// DRM names describe a little-endian 32-bit word, so `ARGB8888` is stored
/// in memory as B, G, R, A.
/// See: <https://github.com/torvalds/linux/blob/master/include/uapi/drm/drm_fourcc.h>
pub mod fourcc {
    /// XRGB8888 - 32-bit RGB with unused alpha (X = ignored)
    pub const XRGB8888: u32 = 0x34325258; // XR24
    /// XBGR8888 - 32-bit BGR with unused alpha
    pub const XBGR8888: u32 = 0x34324258; // XB24
    /// ARGB8888 - 32-bit RGB with alpha
    pub const ARGB8888: u32 = 0x34325241; // AR24
    /// ABGR8888 - 32-bit BGR with alpha
    pub const ABGR8888: u32 = 0x34324241; // AB24
    /// RGB888 - 24-bit RGB
    pub const RGB888: u32 = 0x34324752; // RG24
    /// BGR888 - 24-bit BGR
    pub const BGR888: u32 = 0x34324742; // BG24
}

/// Byte order of one pixel in the frame buffer, first byte first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Blue, green, red, alpha (the framebuffer's native order on most GPUs)
    #[default]
    Bgra,
    /// Blue, green, red, padding
    Bgrx,
    /// Red, green, blue, alpha
    Rgba,
    /// Red, green, blue, padding
    Rgbx,
    /// Packed 24-bit red, green, blue
    Rgb,
    /// Packed 24-bit blue, green, red
    Bgr,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Bgra | Self::Bgrx | Self::Rgba | Self::Rgbx => 4,
            Self::Rgb | Self::Bgr => 3,
        }
    }

    /// Name understood by GStreamer's `videoparse format=`
    pub fn gst_name(&self) -> &'static str {
        match self {
            Self::Bgra => "bgra",
            Self::Bgrx => "bgrx",
            Self::Rgba => "rgba",
            Self::Rgbx => "rgbx",
            Self::Rgb => "rgb",
            Self::Bgr => "bgr",
        }
    }

    /// Equivalent DRM fourcc code
    pub fn fourcc(&self) -> u32 {
        match self {
            Self::Bgra => fourcc::ARGB8888,
            Self::Bgrx => fourcc::XRGB8888,
            Self::Rgba => fourcc::ABGR8888,
            Self::Rgbx => fourcc::XBGR8888,
            Self::Rgb => fourcc::BGR888,
            Self::Bgr => fourcc::RGB888,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.gst_name().to_uppercase())
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bgra" | "argb8888" => Ok(Self::Bgra),
            "bgrx" | "xrgb8888" => Ok(Self::Bgrx),
            "rgba" | "abgr8888" => Ok(Self::Rgba),
            "rgbx" | "xbgr8888" => Ok(Self::Rgbx),
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            _ => Err(format!("Unknown pixel format: {}", s)),
        }
    }
}

/// Format name for debugging
pub fn fourcc_name(code: u32) -> &'static str {
    use fourcc::*;
    match code {
        XRGB8888 => "XRGB8888",
        XBGR8888 => "XBGR8888",
        ARGB8888 => "ARGB8888",
        ABGR8888 => "ABGR8888",
        RGB888 => "RGB888",
        BGR888 => "BGR888",
        _ => "Unknown",
    }
}
