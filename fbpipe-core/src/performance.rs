//! Throughput statistics for a capture session
//!
//! Counts frames and bytes delivered to the sink and derives the effective
//! frame rate, which is below the target rate by however long capture and
//! write take per cycle.

use std::time::{Duration, Instant};

/// Running totals for one session
#[derive(Debug, Clone)]
pub struct FrameStats {
    frames: u64,
    bytes: u64,
    started: Instant,
    last_frame: Option<Instant>,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frames: 0,
            bytes: 0,
            started: Instant::now(),
            last_frame: None,
        }
    }

    /// Record one delivered frame of `bytes` bytes
    pub fn record_frame(&mut self, bytes: usize) {
        self.frames += 1;
        self.bytes += bytes as u64;
        self.last_frame = Some(Instant::now());
    }

    /// Frames delivered
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes delivered
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Time since the session started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Frames per second between the session start and the last frame
    pub fn effective_fps(&self) -> f64 {
        let Some(last) = self.last_frame else {
            return 0.0;
        };
        let secs = last.duration_since(self.started).as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }

    /// Format stats as a single line for logging
    pub fn summary(&self) -> String {
        format!(
            "{} frames, {:.1} MB in {:.1}s ({:.1} fps)",
            self.frames,
            self.bytes as f64 / 1_000_000.0,
            self.elapsed().as_secs_f64(),
            self.effective_fps()
        )
    }
}
