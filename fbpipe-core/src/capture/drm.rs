//! Direct Rendering Manager (DRM) framebuffer capture
//!
//! Wraps the native capture library, which maps the scanout framebuffer of a
//! CRTC and copies a cropped region row by row into our buffer. The library
//! does the DRM work; this type enforces the call order and makes cleanup
//! happen exactly once.
//!
//! # Requirements
//!
//! - Root access OR read/write permission on the DRM device node
//! - A dumb-buffer backed framebuffer on the selected CRTC
//!
//! # Example
//!
//! ```ignore
//! use fbpipe_core::capture::{DrmCapture, FrameSource};
//!
//! let mut capture = DrmCapture::load(None)?;
//! capture.initialize(Path::new("/dev/dri/card1"), CrtcSelect::Auto)?;
//! capture.set_format(geometry)?;
//! capture.capture_frame(&mut buffer, Origin::new(100, 100))?;
//! capture.cleanup();
//! ```

use std::ffi::{CString, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::{debug, info, warn};

use super::FrameSource;
use super::drm_sys::DrmCaptureLib;
use crate::error::{FbpipeError, Result};
use crate::types::{CrtcSelect, FrameBuffer, FrameGeometry, Origin};

/// Lifecycle of the native capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Library loaded, device not opened yet
    Open,
    /// Device opened and framebuffer mapped
    Initialized,
    /// Output geometry declared, ready to capture
    Configured,
    /// Native cleanup has run
    Closed,
}

/// DRM capture through the native library
#[derive(Debug)]
pub struct DrmCapture {
    lib: DrmCaptureLib,
    state: CaptureState,
    geometry: Option<FrameGeometry>,
    frames: u64,
}

impl DrmCapture {
    /// Load the native library from `path`, or from the standard search paths
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(Self::with_lib(DrmCaptureLib::open(path)?))
    }

    fn with_lib(lib: DrmCaptureLib) -> Self {
        Self {
            lib,
            state: CaptureState::Open,
            geometry: None,
            frames: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Number of successful captures
    pub fn frames_captured(&self) -> u64 {
        self.frames
    }
}

fn to_c_int(value: u32, what: &str) -> Result<c_int> {
    c_int::try_from(value)
        .map_err(|_| FbpipeError::config(format!("{} {} does not fit in a C int", what, value)))
}

impl FrameSource for DrmCapture {
    fn name(&self) -> &str {
        "drm"
    }

    fn initialize(&mut self, device: &Path, crtc: CrtcSelect) -> Result<()> {
        if self.state != CaptureState::Open {
            return Err(FbpipeError::invalid_state(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }

        let c_path = CString::new(device.as_os_str().as_bytes()).map_err(|_| {
            FbpipeError::config(format!("Device path {} contains a NUL byte", device.display()))
        })?;

        debug!("drm_initialize({}, {})", device.display(), crtc.as_flag());

        // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
        let status = unsafe { (self.lib.initialize)(c_path.as_ptr(), crtc.as_flag()) };
        if status != 0 {
            return Err(FbpipeError::Init {
                device: device.display().to_string(),
                status,
            });
        }

        info!("DRM capture initialized on {} (crtc {})", device.display(), crtc);
        self.state = CaptureState::Initialized;
        Ok(())
    }

    fn set_format(&mut self, geometry: FrameGeometry) -> Result<()> {
        if self.state != CaptureState::Initialized && self.state != CaptureState::Configured {
            return Err(FbpipeError::invalid_state(format!(
                "set_format called in state {:?}",
                self.state
            )));
        }

        geometry.frame_size()?;
        let width = to_c_int(geometry.width, "Width")?;
        let height = to_c_int(geometry.height, "Height")?;
        let px_size = to_c_int(geometry.pixel_size(), "Pixel size")?;

        // SAFETY: plain integer arguments; the library was initialized above.
        unsafe { (self.lib.capture_format)(width, height, px_size) };

        info!("Capture format set: {}", geometry);
        self.geometry = Some(geometry);
        self.state = CaptureState::Configured;
        Ok(())
    }

    fn capture_frame(&mut self, buffer: &mut FrameBuffer, origin: Origin) -> Result<()> {
        let geometry = match (self.state, self.geometry) {
            (CaptureState::Configured, Some(g)) => g,
            (state, _) => {
                return Err(FbpipeError::invalid_state(format!(
                    "capture_frame called in state {:?}",
                    state
                )));
            }
        };

        // The library writes height * width * pixel_size bytes unconditionally.
        if buffer.geometry() != geometry || buffer.len() != geometry.frame_size()? {
            return Err(FbpipeError::invalid_state(format!(
                "Buffer is {} but capture format is {}",
                buffer.geometry(),
                geometry
            )));
        }

        let x = to_c_int(origin.x, "X offset")?;
        let y = to_c_int(origin.y, "Y offset")?;
        let width = to_c_int(geometry.width, "Width")?;
        let height = to_c_int(geometry.height, "Height")?;

        // SAFETY: buffer holds exactly the bytes the library writes for this
        // geometry (checked above) and is exclusively borrowed for the call.
        let status = unsafe {
            (self.lib.capture_frame)(buffer.as_mut_bytes().as_mut_ptr(), x, y, width, height)
        };
        if status != 0 {
            return Err(FbpipeError::Capture {
                frame: self.frames,
                status,
            });
        }

        self.frames += 1;
        Ok(())
    }

    fn cleanup(&mut self) {
        match self.state {
            CaptureState::Initialized | CaptureState::Configured => {
                // SAFETY: runs once, after a successful initialize.
                unsafe { (self.lib.cleanup)() };
                info!("DRM capture closed after {} frames", self.frames);
            }
            CaptureState::Open => debug!("DRM capture never initialized, nothing to clean up"),
            CaptureState::Closed => return,
        }
        self.state = CaptureState::Closed;
    }
}

impl Drop for DrmCapture {
    fn drop(&mut self) {
        if matches!(
            self.state,
            CaptureState::Initialized | CaptureState::Configured
        ) {
            warn!("DrmCapture dropped without cleanup, releasing now");
            self.cleanup();
        }
    }
}
