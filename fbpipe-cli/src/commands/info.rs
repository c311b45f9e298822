//! Info command - show configuration and system capabilities

use anyhow::Result;
use clap::Args;
use fbpipe_core::capture::{self, drm_sys::DrmCaptureLib};
use fbpipe_core::formats::fourcc_name;
use fbpipe_core::output::{GstPipeline, gst_launch_available, sink_command_line};

use super::options::{StreamOptions, print_config};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    options: StreamOptions,
}

/// Show the resolved configuration, capture library and sink availability
pub async fn info(args: InfoArgs) -> Result<()> {
    println!("fbpipe - System Information\n");

    let config = args.options.resolve()?;
    print_config(&config);

    println!("Pixel Format:");
    println!("  Layout:      {}", config.geometry.format);
    println!(
        "  DRM fourcc:  {} (0x{:08x})",
        fourcc_name(config.geometry.format.fourcc()),
        config.geometry.format.fourcc()
    );
    println!("  Bytes/pixel: {}", config.geometry.pixel_size());
    println!();

    println!("DRM Devices:");
    let devices = capture::list_devices();
    if devices.is_empty() {
        println!("  No /dev/dri/card* nodes found");
    } else {
        for device in &devices {
            let marker = if *device == config.device.display().to_string() {
                " (selected)"
            } else {
                ""
            };
            println!("  {}{}", device, marker);
        }
    }
    if !config.device.exists() {
        println!("  [!!] {} does not exist", config.device.display());
    }
    println!();

    println!("Capture Library:");
    match DrmCaptureLib::open(config.library.as_deref()) {
        Ok(lib) => println!("  [OK] Loaded from {}", lib.path().display()),
        Err(e) => {
            println!("  [!!] {}", e);
            println!();
            println!("  Build it from the C sources and either place libdrm.so in the");
            println!("  working directory or pass --library /path/to/libdrm.so");
        }
    }
    println!();

    println!("Sink:");
    let gst_icon = if gst_launch_available() { "[OK]" } else { "[!!]" };
    println!("  {} gst-launch-1.0 on PATH", gst_icon);
    if config.sink.command.is_some() {
        println!("  Custom command: {}", sink_command_line(&config));
    } else {
        println!("  Pipeline:");
        for element in GstPipeline::from_config(&config).elements() {
            println!("    ! {}", element);
        }
    }

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
