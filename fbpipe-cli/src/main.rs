//! fbpipe CLI
//!
//! Streams a DRM framebuffer region into a GStreamer display pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Stream the default 640x480 region at (100, 100), 25 fps
//! fbpipe stream
//!
//! # Check the pipeline without a display
//! fbpipe stream --test-pattern --frames 100
//!
//! # Show the resolved configuration and what is installed
//! fbpipe info
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// fbpipe - DRM framebuffer capture into a display pipeline
#[derive(Parser)]
#[command(name = "fbpipe")]
#[command(author = "GhostKellz")]
#[command(version)]
#[command(about = "Stream a DRM framebuffer region into a GStreamer display pipeline", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture frames and stream them to the sink pipeline
    #[command(alias = "run")]
    Stream(commands::StreamArgs),

    /// Show the resolved configuration and system capabilities
    Info(commands::InfoArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("fbpipe={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Stream(args) => commands::stream(args).await?,
        Commands::Info(args) => commands::info(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
