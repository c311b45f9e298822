//! Capture session
//!
//! Owns the frame source, the frame buffer and the sink, and runs the
//! capture loop:
//!
//! ```text
//! ┌──────────────┐ capture_frame ┌──────────────┐ write_frame ┌──────────────┐
//! │ FrameSource  │──────────────▶│ FrameBuffer  │────────────▶│  FrameSink   │
//! │ (DRM / test) │               │ (one frame)  │             │ (gst-launch) │
//! └──────────────┘               └──────────────┘             └──────────────┘
//!                      sleep 1/fps, repeat until stopped
//! ```
//!
//! Every exit path (stop request, frame limit, capture failure, write failure,
//! drop) goes through [`CaptureSession::teardown`], which closes the sink and
//! cleans up the source exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::capture::{DrmCapture, FrameSource, TestPattern};
use crate::config::StreamConfig;
use crate::error::{FbpipeError, Result};
use crate::output::{FrameSink, Interrupter, SinkProcess};
use crate::performance::FrameStats;
use crate::types::FrameBuffer;

/// Log progress every this many frames
const PROGRESS_INTERVAL: u64 = 250;

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Frames are flowing
    Running,
    /// Terminal; teardown has run or is running
    Stopped,
}

/// Why the loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stop was requested through the [`StopHandle`]
    Interrupted,
    /// The configured frame limit was reached
    FrameLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::FrameLimit => write!(f, "frame limit reached"),
        }
    }
}

/// Shared flag that asks a running loop to stop
///
/// Checked once per cycle, so the loop notices within one frame interval.
/// While a session runs, a stop also interrupts its sink, so a write blocked on
/// a sink that stopped reading fails instead of hanging.
#[derive(Clone, Default)]
pub struct StopHandle(Arc<StopInner>);

#[derive(Default)]
struct StopInner {
    stopped: AtomicBool,
    interrupter: Mutex<Option<Interrupter>>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
        self.interrupt(false);
    }

    /// Request a stop and kill the sink outright
    pub fn force_stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
        self.interrupt(true);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.stopped.load(Ordering::SeqCst)
    }

    fn interrupt(&self, force: bool) {
        if let Some(interrupt) = self.0.interrupter.lock().as_ref() {
            interrupt(force);
        }
    }

    fn set_interrupter(&self, interrupter: Option<Interrupter>) {
        *self.0.interrupter.lock() = interrupter;
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// One capture run from initialize to cleanup
pub struct CaptureSession<S: FrameSource, K: FrameSink> {
    config: StreamConfig,
    source: S,
    sink: K,
    buffer: FrameBuffer,
    state: SessionState,
    stats: FrameStats,
    torn_down: bool,
}

impl<S: FrameSource, K: FrameSink> CaptureSession<S, K> {
    /// Bring up a session: initialize the source, allocate the buffer, set
    /// the capture format, then spawn the sink
    ///
    /// If initialize fails nothing else happens. If a later step fails the
    /// source is cleaned up before the error is returned.
    pub fn start<F>(config: StreamConfig, mut source: S, spawn_sink: F) -> Result<Self>
    where
        F: FnOnce(&StreamConfig) -> Result<K>,
    {
        config.validate_strict()?;
        for warning in config.validate() {
            warn!("{}", warning);
        }

        if let Err(e) = source.initialize(&config.device, config.crtc) {
            error!("Failed to initialize {} source: {}", source.name(), e);
            return Err(e);
        }

        let prepared = (|| -> Result<(FrameBuffer, K)> {
            let buffer = FrameBuffer::new(config.geometry)?;
            source.set_format(config.geometry)?;
            let sink = spawn_sink(&config)?;
            Ok((buffer, sink))
        })();

        let (buffer, sink) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to start session: {}", e);
                source.cleanup();
                return Err(e);
            }
        };

        info!(
            "Session ready: {} source, {} at {}, {} bytes per frame, {} fps",
            source.name(),
            config.geometry,
            config.origin,
            buffer.len(),
            config.fps
        );

        Ok(Self {
            config,
            source,
            sink,
            buffer,
            state: SessionState::Running,
            stats: FrameStats::new(),
            torn_down: false,
        })
    }

    /// Run the capture loop until stopped, then tear down
    ///
    /// Returns the stop reason on a clean stop. A capture or write failure
    /// ends the loop immediately and is returned after teardown.
    pub fn run(&mut self, stop: &StopHandle) -> Result<StopReason> {
        stop.set_interrupter(self.sink.interrupter());
        let result = self.run_loop(stop);
        stop.set_interrupter(None);
        let teardown = self.teardown();

        match result {
            Ok(reason) => {
                teardown?;
                Ok(reason)
            }
            Err(e) => {
                if let Err(t) = teardown {
                    warn!("Teardown after failure also failed: {}", t);
                }
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, stop: &StopHandle) -> Result<StopReason> {
        if self.state == SessionState::Stopped {
            return Err(FbpipeError::invalid_state("Session has already stopped"));
        }

        let interval = self.config.frame_interval();
        debug!("Frame interval {:?}", interval);

        loop {
            if stop.is_stopped() {
                info!("Stop requested");
                return Ok(StopReason::Interrupted);
            }

            if let Err(e) = self
                .source
                .capture_frame(&mut self.buffer, self.config.origin)
            {
                error!("Capture failed after {} frames: {}", self.stats.frames(), e);
                return Err(e);
            }

            if let Err(e) = self.sink.write_frame(self.buffer.as_bytes()) {
                if stop.is_stopped() {
                    info!("Stop requested during write: {}", e);
                    return Ok(StopReason::Interrupted);
                }
                error!("Write failed after {} frames: {}", self.stats.frames(), e);
                return Err(e);
            }

            self.stats.record_frame(self.buffer.len());

            let frames = self.stats.frames();
            if frames % PROGRESS_INTERVAL == 0 {
                debug!("{}", self.stats.summary());
            }

            if self.config.max_frames.is_some_and(|max| frames >= max) {
                info!("Frame limit of {} reached", frames);
                return Ok(StopReason::FrameLimit);
            }

            std::thread::sleep(interval);
        }
    }

    /// Close the sink and clean up the source
    ///
    /// Runs once; later calls return `Ok(())` without doing anything.
    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.state = SessionState::Stopped;

        let sink_result = self.sink.close();
        if let Err(e) = &sink_result {
            warn!("Failed to close sink: {}", e);
        }
        self.source.cleanup();

        info!("Session finished: {}", self.stats.summary());
        sink_result
    }

    /// Current loop state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Throughput so far
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Configuration the session was started with
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The frame buffer (holds the last captured frame)
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// The frame source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The sink
    pub fn sink(&self) -> &K {
        &self.sink
    }
}

impl<S: FrameSource, K: FrameSink> Drop for CaptureSession<S, K> {
    fn drop(&mut self) {
        if !self.torn_down {
            if let Err(e) = self.teardown() {
                error!("Teardown on drop failed: {}", e);
            }
        }
    }
}

/// Start a session reading the DRM framebuffer through the native library
pub fn start_native(config: StreamConfig) -> Result<CaptureSession<DrmCapture, SinkProcess>> {
    let source = DrmCapture::load(config.library.as_deref())?;
    CaptureSession::start(config, source, SinkProcess::from_config)
}

/// Start a session that streams the synthetic test pattern
pub fn start_test_pattern(
    config: StreamConfig,
) -> Result<CaptureSession<TestPattern, SinkProcess>> {
    CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config)
}
