//! cli
//!
//! Command-line interface for inspecting catalog snapshot dumps.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install the log subscriber
//! - Delegate to command handlers
//!
//! The CLI never owns a live repository. It works on dumps written by an
//! external catalog writer.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::core::config::{CatalogConfig, Config};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration
    pub config: CatalogConfig,
    /// File the configuration came from
    pub config_path: Option<PathBuf>,
    /// Debug logging requested
    pub debug: bool,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let loaded = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    init_logging(&loaded.config, cli.debug);

    let ctx = Context {
        config: loaded.config,
        config_path: loaded.path,
        debug: cli.debug,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the fmt subscriber on stderr.
///
/// `--debug` wins over `RUST_LOG`, which wins over `[log] level`.
fn init_logging(config: &CatalogConfig, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level))
    };

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
