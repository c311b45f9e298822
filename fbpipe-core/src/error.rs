//! Error types for fbpipe

use thiserror::Error;

/// Result type alias using FbpipeError
pub type Result<T> = std::result::Result<T, FbpipeError>;

/// Main error type for fbpipe operations
#[derive(Debug, Error)]
pub enum FbpipeError {
    /// Native capture library could not be loaded or is missing symbols
    #[error("Capture library error: {0}")]
    Library(String),

    /// Native initialize returned a non-zero status
    #[error("Failed to initialize DRM capture on {device} (status {status})")]
    Init {
        /// Device path passed to the library
        device: String,
        /// Status returned by the library
        status: i32,
    },

    /// Native capture_frame returned a non-zero status
    #[error("Failed to capture frame {frame} (status {status})")]
    Capture {
        /// Zero-based index of the frame that failed
        frame: u64,
        /// Status returned by the library
        status: i32,
    },

    /// Operation called in the wrong lifecycle state
    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    /// Sink process error (spawn, write, terminate)
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FbpipeError>,
    },
}

impl FbpipeError {
    /// Create a library error
    pub fn library(msg: impl Into<String>) -> Self {
        Self::Library(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &FbpipeError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the user can fix this without changing code
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::Library(_)
                | Self::Init { .. }
                | Self::Capture { .. }
                | Self::Sink(_)
                | Self::Config(_)
        )
    }

    /// Suggest a fix the user can act on
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Library(_) => Some(
                "Build the capture library (libdrm.so) and pass its path with --library, \
                 or install it as libdrmcapture.so in /usr/local/lib",
            ),
            Self::Init { .. } => Some(
                "Check that the DRM device exists, that you have read/write access \
                 (video group or root), and that no other process holds it",
            ),
            Self::Capture { .. } => Some(
                "The capture region may exceed the framebuffer; check --x/--y and the \
                 display resolution",
            ),
            Self::Sink(_) => Some(
                "Make sure gst-launch-1.0 and the required GStreamer plugins are installed",
            ),
            Self::Config(_) => Some("Check ~/.config/fbpipe/config.toml for invalid values"),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<libloading::Error> for FbpipeError {
    fn from(err: libloading::Error) -> Self {
        Self::Library(err.to_string())
    }
}

impl From<toml::de::Error> for FbpipeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}
