//! CLI command implementations

mod config;
mod info;
mod options;
mod stream;

pub use config::{ConfigArgs, config};
pub use info::{InfoArgs, info};
pub use stream::{StreamArgs, stream};
