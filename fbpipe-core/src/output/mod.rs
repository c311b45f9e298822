//! Frame output
//!
//! Frames leave fbpipe through a [`FrameSink`]. The real sink is a
//! gst-launch pipeline running as a child process:
//! - `gst`: builds the pipeline description from the stream geometry
//! - `process`: spawns the child, writes frames to its stdin, stops it

mod gst;
mod process;

pub use gst::{GST_LAUNCH, GstPipeline, gst_launch_available, sink_command_line};
pub use process::SinkProcess;

use crate::error::Result;

/// Callback that unblocks a pending write by stopping the consumer
///
/// The argument is `true` when the stop is forced.
pub type Interrupter = Box<dyn Fn(bool) + Send + Sync>;

/// Destination for raw frames
pub trait FrameSink {
    /// Write one whole frame and flush it
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Close the input and stop the consumer
    ///
    /// Calling it again after it has run is a no-op.
    fn close(&mut self) -> Result<()>;

    /// A handle another thread can use to make a blocked `write_frame` fail
    fn interrupter(&self) -> Option<Interrupter> {
        None
    }
}
