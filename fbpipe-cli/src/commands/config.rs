//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fbpipe_core::config::{ConfigFile, sample_config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the current configuration
    Show,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,

    /// Check that the config file parses and resolves
    Check,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    let path = ConfigFile::default_path();

    match args.command {
        ConfigCommand::Path => {
            let state = if path.exists() { "exists" } else { "not created" };
            println!("{} ({})", path.display(), state);
        }
        ConfigCommand::Show => {
            let file = ConfigFile::load_from(path.clone())
                .with_context(|| format!("Failed to load {}", path.display()))?;

            if path.exists() {
                println!("# Effective settings from {}\n", path.display());
            } else {
                println!("# No file at {}, showing compiled-in defaults", path.display());
                println!("# Create one with: fbpipe config init\n");
            }
            print!("{}", file.to_toml()?);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite it with the sample.");
                return Ok(());
            }

            ConfigFile::save_sample_to(path.clone())?;
            println!("Created configuration file: {}", path.display());
            println!("Edit it to change the capture region, device and sink pipeline.");
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
        ConfigCommand::Check => {
            let config = ConfigFile::load_from(path.clone())
                .and_then(|file| file.to_stream_config())
                .and_then(|config| config.validate_strict().map(|()| config))
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;

            println!("Configuration OK: {}", path.display());
            println!("  Region: {} at {}, {} fps", config.geometry, config.origin, config.fps);
            for warning in config.validate() {
                println!("  Warning: {}", warning);
            }
        }
    }

    Ok(())
}
