//! Command line interface for catalog_release_sync.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig};
pub use commands::execute;
pub use output::OutputManager;

use crate::EnvConfig;
use crate::error::Result;

/// Main CLI entry point
pub async fn run(env: &EnvConfig) -> Result<i32> {
    let args = Args::parse_args();
    execute(args, env).await
}
