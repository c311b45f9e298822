//! fbpipe Core Library
//!
//! Streams a region of a DRM framebuffer into a GStreamer display pipeline.
//!
//! This library provides:
//! - A binding to the native DRM capture library (loaded at runtime)
//! - A gst-launch sink process fed with raw frames on stdin
//! - The capture session that paces frames between the two
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │ DRM Capture     │───▶│ Frame Buffer │───▶│ gst-launch-1.0  │
//! │ (native lib)    │    │ (BGRA, raw)  │    │ (stdin pipe)    │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod formats;
pub mod output;
pub mod performance;
pub mod session;
pub mod types;

pub use config::{ConfigFile, SinkConfig, StreamConfig};
pub use error::{FbpipeError, Result};
pub use formats::PixelFormat;
pub use session::{CaptureSession, SessionState, StopHandle, StopReason};
pub use types::{CrtcSelect, FrameBuffer, FrameGeometry, Origin};
