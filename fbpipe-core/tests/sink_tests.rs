//! End-to-end tests driving a real sink process through the session

use std::thread;
use std::time::{Duration, Instant};

use fbpipe_core::capture::TestPattern;
use fbpipe_core::capture::pattern::pattern_byte;
use fbpipe_core::config::StreamConfig;
use fbpipe_core::error::FbpipeError;
use fbpipe_core::formats::PixelFormat;
use fbpipe_core::output::SinkProcess;
use fbpipe_core::session::{CaptureSession, StopHandle, StopReason};
use tempfile::TempDir;

#[test]
fn test_frames_reach_sink_stdin() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("frames.raw");

    // The sink ignores SIGTERM so it drains stdin before exiting.
    let config = StreamConfig::default()
        .with_size(4, 2)
        .with_format(PixelFormat::Bgra)
        .with_fps(200)
        .with_max_frames(5)
        .with_sink_command(format!("trap '' TERM; cat > '{}'", out.display()))
        .with_terminate_timeout(Duration::from_secs(5));
    let frame_size = config.frame_size().unwrap();

    let mut session =
        CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config).unwrap();
    assert_eq!(session.run(&StopHandle::new()).unwrap(), StopReason::FrameLimit);
    assert!(session.sink().is_closed());
    assert_eq!(session.sink().frames_written(), 5);
    assert!(session.source().is_cleaned_up());

    let data = std::fs::read(&out).unwrap();
    assert_eq!(data.len(), 5 * frame_size);
    for (frame, chunk) in data.chunks(frame_size).enumerate() {
        for (offset, byte) in chunk.iter().enumerate() {
            assert_eq!(*byte, pattern_byte(frame as u64, offset));
        }
    }
}

#[test]
fn test_exited_sink_ends_session() {
    let config = StreamConfig::default()
        .with_size(64, 64)
        .with_fps(1000)
        .with_max_frames(10_000)
        .with_sink_command("exit 0");

    let mut session =
        CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config).unwrap();
    let err = session.run(&StopHandle::new()).unwrap_err();

    assert!(matches!(err, FbpipeError::Sink(_)));
    assert!(session.sink().is_closed());
    assert!(session.source().is_cleaned_up());
    assert!(session.stats().frames() < 10_000);
}

#[test]
fn test_missing_sink_program_fails_session() {
    let config = StreamConfig::default()
        .with_size(64, 64)
        .with_fps(1000)
        .with_max_frames(10_000)
        .with_sink_command("exec /nonexistent/fbpipe-sink");

    let mut session =
        CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config).unwrap();
    assert!(session.run(&StopHandle::new()).is_err());
    assert!(session.source().is_cleaned_up());
}

#[test]
fn test_stop_reaches_sink_that_never_reads() {
    // 256 KiB frames overflow the pipe buffer, so the first write blocks
    let config = StreamConfig::default()
        .with_size(256, 256)
        .with_fps(25)
        .with_sink_command("sleep 30")
        .with_terminate_timeout(Duration::from_secs(1));
    let stop = StopHandle::new();

    let mut session =
        CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config).unwrap();

    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        remote.stop();
    });

    let started = Instant::now();
    let reason = session.run(&stop).unwrap();
    stopper.join().unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(session.stats().frames(), 0);
    assert!(session.sink().is_closed());
    assert!(session.source().is_cleaned_up());
}

#[test]
fn test_force_stop_kills_sink_ignoring_term() {
    let config = StreamConfig::default()
        .with_size(256, 256)
        .with_fps(25)
        .with_sink_command("trap '' TERM; sleep 30")
        .with_terminate_timeout(Duration::from_secs(1));
    let stop = StopHandle::new();

    let mut session =
        CaptureSession::start(config, TestPattern::new(), SinkProcess::from_config).unwrap();

    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        remote.force_stop();
    });

    let started = Instant::now();
    assert_eq!(session.run(&stop).unwrap(), StopReason::Interrupted);
    stopper.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(session.source().is_cleaned_up());
}
