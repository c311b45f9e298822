//! Raw FFI bindings for the native DRM capture library
//!
//! The library maps the active CRTC's framebuffer and copies a cropped region
//! out of it. It keeps its state in globals, so only one capture session per
//! process can be active. Loaded dynamically at runtime.

use std::ffi::{c_char, c_int};
use std::path::{Path, PathBuf};

use crate::error::{FbpipeError, Result};

/// Function pointer types for dynamically loaded functions
pub type FnDrmInitialize =
    unsafe extern "C" fn(device_path: *const c_char, crtc_index: c_int) -> c_int;

pub type FnDrmCaptureFormat = unsafe extern "C" fn(width: c_int, height: c_int, px_size: c_int);

pub type FnDrmCaptureFrame = unsafe extern "C" fn(
    dest_buffer: *mut u8,
    x_offset: c_int,
    y_offset: c_int,
    width: c_int,
    height: c_int,
) -> c_int;

pub type FnDrmCleanup = unsafe extern "C" fn();

/// Library paths to search when no explicit path is configured
pub const DRM_CAPTURE_LIB_PATHS: &[&str] = &[
    // Built next to the binary
    "./libdrm.so",
    "libdrmcapture.so",
    "/usr/local/lib/libdrmcapture.so",
    "/usr/lib/libdrmcapture.so",
];

/// Dynamically loaded capture library
pub struct DrmCaptureLib {
    /// Keeps the symbols below valid; `None` for in-process function tables
    _lib: Option<libloading::Library>,
    path: PathBuf,
    pub initialize: FnDrmInitialize,
    pub capture_format: FnDrmCaptureFormat,
    pub capture_frame: FnDrmCaptureFrame,
    pub cleanup: FnDrmCleanup,
}

impl DrmCaptureLib {
    /// Try to load the library from the standard paths
    pub fn load() -> Result<Self> {
        let mut last_err = None;
        for path in DRM_CAPTURE_LIB_PATHS {
            match Self::load_from_path(Path::new(path)) {
                Ok(lib) => {
                    tracing::info!("Loaded capture library from: {}", path);
                    return Ok(lib);
                }
                Err(e) => {
                    tracing::debug!("{}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            FbpipeError::library("No capture library search paths configured")
        }))
    }

    /// Load the library from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        // SAFETY: Loading runs the library's initializers. The capture library is
        // a plain C shared object without constructors; the symbol types below
        // match its exported prototypes. Function pointers are copied out while
        // `lib` is alive and `lib` is stored alongside them.
        unsafe {
            let lib = libloading::Library::new(path).map_err(|e| {
                FbpipeError::library(format!("Failed to load {}: {}", path.display(), e))
            })?;

            let initialize: FnDrmInitialize = *lib
                .get::<FnDrmInitialize>(b"drm_initialize\0")
                .map_err(|e| FbpipeError::library(format!("Failed to get drm_initialize: {}", e)))?;

            let capture_format: FnDrmCaptureFormat = *lib
                .get::<FnDrmCaptureFormat>(b"drm_capture_format\0")
                .map_err(|e| {
                    FbpipeError::library(format!("Failed to get drm_capture_format: {}", e))
                })?;

            let capture_frame: FnDrmCaptureFrame = *lib
                .get::<FnDrmCaptureFrame>(b"drm_capture_frame\0")
                .map_err(|e| {
                    FbpipeError::library(format!("Failed to get drm_capture_frame: {}", e))
                })?;

            let cleanup: FnDrmCleanup = *lib
                .get::<FnDrmCleanup>(b"drm_cleanup\0")
                .map_err(|e| FbpipeError::library(format!("Failed to get drm_cleanup: {}", e)))?;

            Ok(Self {
                _lib: Some(lib),
                path: path.to_path_buf(),
                initialize,
                capture_format,
                capture_frame,
                cleanup,
            })
        }
    }

    /// Load from `path` when given, otherwise search the standard paths
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Build a function table from functions linked into this process
    #[cfg(test)]
    pub(crate) fn from_fns(
        initialize: FnDrmInitialize,
        capture_format: FnDrmCaptureFormat,
        capture_frame: FnDrmCaptureFrame,
        cleanup: FnDrmCleanup,
    ) -> Self {
        Self {
            _lib: None,
            path: PathBuf::from("(in-process)"),
            initialize,
            capture_format,
            capture_frame,
            cleanup,
        }
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DrmCaptureLib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrmCaptureLib")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_library_error() {
        let err = DrmCaptureLib::load_from_path(Path::new("/nonexistent/libdrm.so")).unwrap_err();
        assert!(matches!(err, FbpipeError::Library(_)));
        assert!(err.to_string().contains("/nonexistent/libdrm.so"));
    }
}
