//! Synthetic frame source
//!
//! Produces an incrementing byte pattern so the sink side of the pipeline can
//! be run and verified without a DRM device.

use std::path::Path;

use tracing::debug;

use super::FrameSource;
use crate::error::{FbpipeError, Result};
use crate::types::{CrtcSelect, FrameBuffer, FrameGeometry, Origin};

/// Value of byte `offset` in frame `frame` of the test pattern
pub fn pattern_byte(frame: u64, offset: usize) -> u8 {
    (frame as usize).wrapping_add(offset) as u8
}

/// Frame source that fills every byte with `(frame + offset) mod 256`
#[derive(Debug, Default)]
pub struct TestPattern {
    initialized: bool,
    geometry: Option<FrameGeometry>,
    frame: u64,
    cleaned_up: bool,
}

impl TestPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next frame to be generated
    pub fn next_frame(&self) -> u64 {
        self.frame
    }

    /// Whether cleanup has run
    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up
    }
}

impl FrameSource for TestPattern {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn initialize(&mut self, device: &Path, crtc: CrtcSelect) -> Result<()> {
        debug!(
            "Test pattern ignoring device {} (crtc {})",
            device.display(),
            crtc
        );
        self.initialized = true;
        Ok(())
    }

    fn set_format(&mut self, geometry: FrameGeometry) -> Result<()> {
        if !self.initialized {
            return Err(FbpipeError::invalid_state("set_format before initialize"));
        }
        geometry.frame_size()?;
        self.geometry = Some(geometry);
        Ok(())
    }

    fn capture_frame(&mut self, buffer: &mut FrameBuffer, _origin: Origin) -> Result<()> {
        match self.geometry {
            Some(g) if g == buffer.geometry() => {}
            Some(g) => {
                return Err(FbpipeError::invalid_state(format!(
                    "Buffer is {} but capture format is {}",
                    buffer.geometry(),
                    g
                )));
            }
            None => return Err(FbpipeError::invalid_state("capture_frame before set_format")),
        }

        let frame = self.frame;
        for (offset, byte) in buffer.as_mut_bytes().iter_mut().enumerate() {
            *byte = pattern_byte(frame, offset);
        }
        self.frame += 1;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.cleaned_up = true;
    }
}
