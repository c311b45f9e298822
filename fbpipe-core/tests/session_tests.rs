//! Integration tests for the capture session lifecycle

mod mocks;

use std::thread;
use std::time::Duration;

use fbpipe_core::capture::pattern::pattern_byte;
use fbpipe_core::error::FbpipeError;
use fbpipe_core::session::{CaptureSession, SessionState, StopHandle, StopReason};
use fbpipe_core::types::Origin;
use mocks::{
    MockSource, failing_sink, new_log, recording_sink, small_config, unspawnable_sink,
};

#[test]
fn test_frame_limit_writes_pattern() {
    let log = new_log();
    let config = small_config().with_max_frames(5);
    let frame_size = config.frame_size().unwrap();

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    let reason = session.run(&StopHandle::new()).unwrap();

    assert_eq!(reason, StopReason::FrameLimit);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.stats().frames(), 5);
    assert_eq!(session.stats().bytes(), 5 * frame_size as u64);

    let log = log.lock();
    assert_eq!(log.writes.len(), 5);
    for (frame, data) in log.writes.iter().enumerate() {
        assert_eq!(data.len(), frame_size);
        for (offset, byte) in data.iter().enumerate() {
            assert_eq!(*byte, pattern_byte(frame as u64, offset));
        }
    }
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_lifecycle_order() {
    let log = new_log();
    let config = small_config().with_max_frames(2);

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    session.run(&StopHandle::new()).unwrap();

    assert_eq!(
        log.lock().events,
        vec![
            "initialize",
            "set_format",
            "spawn_sink",
            "capture",
            "write",
            "capture",
            "write",
            "close",
            "cleanup",
        ]
    );
}

#[test]
fn test_capture_uses_configured_origin() {
    let log = new_log();
    let config = small_config().with_origin(7, 9).with_max_frames(3);

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    session.run(&StopHandle::new()).unwrap();

    assert!(log.lock().origins.iter().all(|o| *o == Origin::new(7, 9)));
}

#[test]
fn test_capture_failure_tears_down_once() {
    let log = new_log();
    let source = MockSource::failing_on(log.clone(), 4);

    let mut session =
        CaptureSession::start(small_config(), source, recording_sink(log.clone())).unwrap();
    let err = session.run(&StopHandle::new()).unwrap_err();

    assert!(matches!(err, FbpipeError::Capture { frame: 3, .. }));
    assert_eq!(session.state(), SessionState::Stopped);
    drop(session);

    let log = log.lock();
    assert_eq!(log.writes.len(), 3);
    assert_eq!(log.capture_calls, 4);
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_first_capture_failure_writes_nothing() {
    let log = new_log();
    let source = MockSource::failing_on(log.clone(), 1);

    let mut session =
        CaptureSession::start(small_config(), source, recording_sink(log.clone())).unwrap();
    assert!(session.run(&StopHandle::new()).is_err());

    let log = log.lock();
    assert!(log.writes.is_empty());
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_init_failure_skips_everything() {
    let log = new_log();
    let source = MockSource::failing_init(log.clone(), -1);

    let result = CaptureSession::start(small_config(), source, recording_sink(log.clone()));
    assert!(matches!(result, Err(FbpipeError::Init { status: -1, .. })));

    let log = log.lock();
    assert_eq!(log.initialize_calls, 1);
    assert_eq!(log.set_format_calls, 0);
    assert_eq!(log.sink_spawns, 0);
    assert_eq!(log.capture_calls, 0);
    assert_eq!(log.cleanup_calls, 0);
}

#[test]
fn test_sink_spawn_failure_cleans_up_source() {
    let log = new_log();

    let result =
        CaptureSession::start(small_config(), MockSource::new(log.clone()), unspawnable_sink(log.clone()));
    assert!(matches!(result, Err(FbpipeError::Sink(_))));

    let log = log.lock();
    assert_eq!(log.sink_spawns, 1);
    assert_eq!(log.capture_calls, 0);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_invalid_config_rejected_before_initialize() {
    let log = new_log();
    let config = small_config().with_fps(0);

    let result = CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()));
    assert!(matches!(result, Err(FbpipeError::Config(_))));
    assert_eq!(log.lock().initialize_calls, 0);
}

#[test]
fn test_write_failure_tears_down() {
    let log = new_log();

    let mut session =
        CaptureSession::start(small_config(), MockSource::new(log.clone()), failing_sink(log.clone(), 3))
            .unwrap();
    let err = session.run(&StopHandle::new()).unwrap_err();

    assert!(matches!(err, FbpipeError::Sink(_)));
    assert_eq!(session.stats().frames(), 2);
    drop(session);

    let log = log.lock();
    assert_eq!(log.writes.len(), 2);
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_stop_before_run() {
    let log = new_log();
    let stop = StopHandle::new();
    stop.stop();

    let mut session =
        CaptureSession::start(small_config(), MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    assert_eq!(session.run(&stop).unwrap(), StopReason::Interrupted);

    let log = log.lock();
    assert_eq!(log.capture_calls, 0);
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_stop_from_another_thread() {
    let log = new_log();
    let config = small_config().with_fps(100);
    let stop = StopHandle::new();

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();

    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.stop();
    });

    assert_eq!(session.run(&stop).unwrap(), StopReason::Interrupted);
    stopper.join().unwrap();

    let log = log.lock();
    assert!(!log.writes.is_empty());
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_run_twice_rejected() {
    let log = new_log();
    let config = small_config().with_max_frames(1);

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    session.run(&StopHandle::new()).unwrap();

    assert!(matches!(
        session.run(&StopHandle::new()),
        Err(FbpipeError::InvalidState(_))
    ));
    assert_eq!(log.lock().capture_calls, 1);
    assert_eq!(log.lock().cleanup_calls, 1);
}

#[test]
fn test_drop_without_run_tears_down() {
    let log = new_log();

    let session =
        CaptureSession::start(small_config(), MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    drop(session);

    let log = log.lock();
    assert_eq!(log.capture_calls, 0);
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_drop_after_run_does_not_repeat_teardown() {
    let log = new_log();
    let config = small_config().with_max_frames(2);

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    session.run(&StopHandle::new()).unwrap();
    session.teardown().unwrap();
    drop(session);

    let log = log.lock();
    assert_eq!(log.close_calls, 1);
    assert_eq!(log.cleanup_calls, 1);
}

#[test]
fn test_pacing_follows_frame_interval() {
    let log = new_log();
    let config = small_config().with_fps(25).with_max_frames(6);

    let mut session =
        CaptureSession::start(config, MockSource::new(log.clone()), recording_sink(log.clone()))
            .unwrap();
    session.run(&StopHandle::new()).unwrap();

    let log = log.lock();
    assert_eq!(log.write_times.len(), 6);
    for pair in log.write_times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(38), "gap {:?} too short", gap);
        assert!(gap < Duration::from_secs(1), "gap {:?} too long", gap);
    }
}
