//! Sink subprocess
//!
//! Runs the rendering pipeline as a child process and feeds it frames on
//! stdin. Closing drops stdin first, then asks the child to exit with SIGTERM
//! and kills it if it is still alive after the grace period.
//!
//! A write blocks while the child is not reading. [`SinkProcess::interrupter`]
//! hands out a callback that signals the child's process group from another
//! thread, which makes the blocked write fail with a broken pipe.

use std::io::{ErrorKind, Write};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::{FrameSink, Interrupter};
use super::gst::sink_command_line;
use crate::config::StreamConfig;
use crate::error::{FbpipeError, Result};

/// Poll interval while waiting for the child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A running sink process
pub struct SinkProcess {
    command: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    terminate_timeout: Duration,
    exit_status: Option<ExitStatus>,
    frames_written: u64,
    /// Process group to signal on interrupt; cleared before the child is reaped
    group: Arc<Mutex<Option<libc::pid_t>>>,
}

impl SinkProcess {
    /// Spawn `command` through `sh -c` with a piped stdin
    ///
    /// The child gets its own process group so a Ctrl+C in the terminal only
    /// reaches us, and we decide when the sink goes away.
    pub fn spawn(command: &str, terminate_timeout: Duration) -> Result<Self> {
        info!("Starting sink: {}", command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| FbpipeError::sink(format!("Failed to spawn `{}`: {}", command, e)))?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FbpipeError::sink("Failed to capture sink stdin"));
        };

        debug!("Sink running with pid {}", child.id());
        let group = Arc::new(Mutex::new(Some(child.id() as libc::pid_t)));

        Ok(Self {
            command: command.to_string(),
            child: Some(child),
            stdin: Some(stdin),
            terminate_timeout,
            exit_status: None,
            frames_written: 0,
            group,
        })
    }

    /// Spawn the sink described by the stream configuration
    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        Self::spawn(&sink_command_line(config), config.sink.terminate_timeout)
    }

    /// Command line the sink was started with
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Process ID while the sink is running
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.child.is_none()
    }

    /// Exit status collected by `close`
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn terminate(&self, mut child: Child) -> Result<ExitStatus> {
        match self.wait_for_exit(&mut child) {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!("Lost track of sink {}: {}, killing", child.id(), e);
                force_reap(&mut child)
                    .map_err(|e| FbpipeError::sink(format!("Failed to reap sink: {}", e)))
            }
        }
    }

    fn wait_for_exit(&self, child: &mut Child) -> std::io::Result<ExitStatus> {
        if let Some(status) = child.try_wait()? {
            debug!("Sink already exited: {}", status);
            return Ok(status);
        }

        let pid = child.id() as libc::pid_t;
        if let Err(e) = signal_group(pid, libc::SIGTERM) {
            warn!("Failed to send SIGTERM to sink {}: {}", pid, e);
        }

        let deadline = Instant::now() + self.terminate_timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    "Sink {} still running after {:?}, killing",
                    pid, self.terminate_timeout
                );
                if signal_group(pid, libc::SIGKILL).is_err() {
                    child.kill()?;
                }
                return child.wait();
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

/// Kill the child and wait for it so it never lingers as a zombie
fn force_reap(child: &mut Child) -> std::io::Result<ExitStatus> {
    if let Err(e) = signal_group(child.id() as libc::pid_t, libc::SIGKILL) {
        debug!("SIGKILL to sink group failed: {}", e);
        let _ = child.kill();
    }
    child.wait()
}

/// Signal every process in the sink's process group
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> std::io::Result<()> {
    // SAFETY: kill(2) on the group led by a child we spawned and have not
    // reaped yet, so the id cannot have been recycled.
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

impl FrameSink for SinkProcess {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| FbpipeError::sink("Sink input is closed"))?;

        stdin
            .write_all(frame)
            .and_then(|()| stdin.flush())
            .map_err(|e| match e.kind() {
                ErrorKind::BrokenPipe => {
                    FbpipeError::sink("Sink process closed its input (broken pipe)")
                }
                _ => FbpipeError::sink(format!("Failed to write frame: {}", e)),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        drop(self.stdin.take());
        self.group.lock().take();

        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let status = self.terminate(child)?;
        info!(
            "Sink exited ({}) after {} frames",
            status, self.frames_written
        );
        self.exit_status = Some(status);
        Ok(())
    }

    fn interrupter(&self) -> Option<Interrupter> {
        let group = Arc::clone(&self.group);
        Some(Box::new(move |force| {
            let guard = group.lock();
            let Some(pgid) = *guard else {
                return;
            };
            let signal = if force { libc::SIGKILL } else { libc::SIGTERM };
            info!("Interrupting sink group {} with signal {}", pgid, signal);
            if let Err(e) = signal_group(pgid, signal) {
                warn!("Failed to signal sink group {}: {}", pgid, e);
            }
        }))
    }
}

impl Drop for SinkProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.close() {
                error!("Failed to stop sink: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for SinkProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkProcess")
            .field("command", &self.command)
            .field("pid", &self.id())
            .field("frames_written", &self.frames_written)
            .finish()
    }
}
