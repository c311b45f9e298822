//! Mock infrastructure for testing
//!
//! A frame source and a sink that record every call into a shared log, with
//! switches to make initialize, a given capture, or a given write fail.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use fbpipe_core::capture::{FrameSource, TestPattern};
use fbpipe_core::config::StreamConfig;
use fbpipe_core::error::{FbpipeError, Result};
use fbpipe_core::formats::PixelFormat;
use fbpipe_core::output::FrameSink;
use fbpipe_core::types::{CrtcSelect, FrameBuffer, FrameGeometry, Origin};
use parking_lot::Mutex;

/// Everything the mocks saw, in order
#[derive(Debug, Default)]
pub struct CallLog {
    /// Call names in the order they happened
    pub events: Vec<&'static str>,
    pub initialize_calls: usize,
    pub set_format_calls: usize,
    pub capture_calls: usize,
    pub cleanup_calls: usize,
    pub sink_spawns: usize,
    pub close_calls: usize,
    /// Copies of every frame written to the sink
    pub writes: Vec<Vec<u8>>,
    /// When each write happened
    pub write_times: Vec<Instant>,
    /// Origin passed to every capture
    pub origins: Vec<Origin>,
}

pub type SharedLog = Arc<Mutex<CallLog>>;

pub fn new_log() -> SharedLog {
    Arc::new(Mutex::new(CallLog::default()))
}

/// Small geometry so frames are cheap to copy
pub fn small_config() -> StreamConfig {
    StreamConfig::default()
        .with_size(4, 2)
        .with_format(PixelFormat::Bgra)
        .with_fps(1000)
}

/// Frame source backed by the test pattern
pub struct MockSource {
    log: SharedLog,
    pattern: TestPattern,
    /// Status returned by initialize (non-zero fails)
    pub init_status: i32,
    /// 1-based capture cycle that fails
    pub fail_on_cycle: Option<usize>,
}

impl MockSource {
    pub fn new(log: SharedLog) -> Self {
        Self {
            log,
            pattern: TestPattern::new(),
            init_status: 0,
            fail_on_cycle: None,
        }
    }

    pub fn failing_init(log: SharedLog, status: i32) -> Self {
        Self {
            init_status: status,
            ..Self::new(log)
        }
    }

    pub fn failing_on(log: SharedLog, cycle: usize) -> Self {
        Self {
            fail_on_cycle: Some(cycle),
            ..Self::new(log)
        }
    }
}

impl FrameSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn initialize(&mut self, device: &Path, crtc: CrtcSelect) -> Result<()> {
        {
            let mut log = self.log.lock();
            log.events.push("initialize");
            log.initialize_calls += 1;
        }
        if self.init_status != 0 {
            return Err(FbpipeError::Init {
                device: device.display().to_string(),
                status: self.init_status,
            });
        }
        self.pattern.initialize(device, crtc)
    }

    fn set_format(&mut self, geometry: FrameGeometry) -> Result<()> {
        {
            let mut log = self.log.lock();
            log.events.push("set_format");
            log.set_format_calls += 1;
        }
        self.pattern.set_format(geometry)
    }

    fn capture_frame(&mut self, buffer: &mut FrameBuffer, origin: Origin) -> Result<()> {
        let cycle = {
            let mut log = self.log.lock();
            log.events.push("capture");
            log.capture_calls += 1;
            log.origins.push(origin);
            log.capture_calls
        };
        if self.fail_on_cycle == Some(cycle) {
            return Err(FbpipeError::Capture {
                frame: cycle as u64 - 1,
                status: -1,
            });
        }
        self.pattern.capture_frame(buffer, origin)
    }

    fn cleanup(&mut self) {
        let mut log = self.log.lock();
        log.events.push("cleanup");
        log.cleanup_calls += 1;
    }
}

/// Sink that keeps every frame in memory
pub struct RecordingSink {
    log: SharedLog,
    /// 1-based write that fails with a broken pipe
    pub fail_on_write: Option<usize>,
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut log = self.log.lock();
        log.events.push("write");
        if self.fail_on_write == Some(log.writes.len() + 1) {
            return Err(FbpipeError::sink("Sink process closed its input (broken pipe)"));
        }
        log.writes.push(frame.to_vec());
        log.write_times.push(Instant::now());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        log.events.push("close");
        log.close_calls += 1;
        Ok(())
    }
}

/// Sink factory for `CaptureSession::start`
pub fn recording_sink(log: SharedLog) -> impl FnOnce(&StreamConfig) -> Result<RecordingSink> {
    move |_config| {
        let mut guard = log.lock();
        guard.events.push("spawn_sink");
        guard.sink_spawns += 1;
        drop(guard);
        Ok(RecordingSink {
            log,
            fail_on_write: None,
        })
    }
}

/// Sink factory whose sink fails on the given write
pub fn failing_sink(
    log: SharedLog,
    write: usize,
) -> impl FnOnce(&StreamConfig) -> Result<RecordingSink> {
    move |_config| {
        log.lock().sink_spawns += 1;
        Ok(RecordingSink {
            log,
            fail_on_write: Some(write),
        })
    }
}

/// Sink factory that fails to spawn
pub fn unspawnable_sink(log: SharedLog) -> impl FnOnce(&StreamConfig) -> Result<RecordingSink> {
    move |_config| {
        log.lock().sink_spawns += 1;
        Err(FbpipeError::sink("Failed to spawn `gst-launch-1.0`"))
    }
}
