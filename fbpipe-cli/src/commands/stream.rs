//! Stream command - capture frames and feed the sink pipeline

use anyhow::{Context, Result};
use clap::Args;
use fbpipe_core::capture::FrameSource;
use fbpipe_core::output::{FrameSink, sink_command_line};
use fbpipe_core::performance::FrameStats;
use fbpipe_core::session::{self, CaptureSession, StopHandle, StopReason};
use fbpipe_core::FbpipeError;
use tokio::signal;
use tracing::{error, info};

use super::options::{StreamOptions, print_config};

/// Arguments for the stream command
#[derive(Args)]
pub struct StreamArgs {
    #[command(flatten)]
    options: StreamOptions,

    /// Stop after this many frames
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Stream a synthetic test pattern instead of the DRM framebuffer
    #[arg(long)]
    test_pattern: bool,

    /// Print the resolved configuration and sink command, then exit
    #[arg(long)]
    dry_run: bool,
}

/// Run a session to completion and keep its stats
fn run_session<S: FrameSource, K: FrameSink>(
    mut session: CaptureSession<S, K>,
    stop: &StopHandle,
) -> (fbpipe_core::Result<StopReason>, FrameStats) {
    let result = session.run(stop);
    (result, session.stats().clone())
}

/// Print the hint for a core error and convert it for anyhow
fn report(err: FbpipeError) -> anyhow::Error {
    if let Some(hint) = err.user_hint() {
        eprintln!("Hint: {}", hint);
    }
    anyhow::Error::new(err)
}

/// Capture and stream until interrupted or failed
pub async fn stream(args: StreamArgs) -> Result<()> {
    println!("fbpipe - Starting Capture\n");

    let mut config = args.options.resolve()?;
    if let Some(frames) = args.frames {
        config = config.with_max_frames(frames);
    }
    config.validate_strict()?;

    print_config(&config);
    println!("Sink command:");
    println!("  {}", sink_command_line(&config));
    println!();

    if args.dry_run {
        return Ok(());
    }

    let stop = StopHandle::new();
    let watcher = stop.clone();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            return;
        }
        println!("\nReceived interrupt signal, stopping (Ctrl+C again to force)...");
        watcher.stop();

        if signal::ctrl_c().await.is_ok() {
            eprintln!("Forced exit");
            watcher.force_stop();
            std::process::exit(130);
        }
    });

    println!("Press Ctrl+C to stop...\n");

    let test_pattern = args.test_pattern;
    let started = tokio::task::spawn_blocking(move || {
        if test_pattern {
            session::start_test_pattern(config).map(|s| run_session(s, &stop))
        } else {
            session::start_native(config).map(|s| run_session(s, &stop))
        }
    })
    .await
    .context("Capture thread panicked")?;

    ctrl_c.abort();

    let (result, stats) = match started {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to start capture: {}", e);
            return Err(report(e)).context("Failed to start capture");
        }
    };

    println!("Capture stopped.");
    println!("  Frames:    {}", stats.frames());
    println!("  Data:      {:.1} MB", stats.bytes() as f64 / 1_000_000.0);
    println!("  Duration:  {:.1} s", stats.elapsed().as_secs_f64());
    println!("  Delivered: {:.1} fps", stats.effective_fps());

    match result {
        Ok(reason) => {
            info!("Capture ended: {}", reason);
            println!("  Reason:    {}", reason);
            Ok(())
        }
        Err(e) => Err(report(e)).context("Capture session failed"),
    }
}
