//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the snapshot dump named on the command line
//! 2. Calls into the catalog
//! 3. Formats and displays output

mod config_cmd;
mod fingerprint;
mod show;
mod verify;

pub use config_cmd::config;
pub use fingerprint::fingerprint;
pub use show::{render_tree, show};
pub use verify::verify;

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::catalog::dump::SnapshotDump;
use crate::catalog::Snapshot;
use crate::cli::args::Command;
use crate::cli::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Show { dump, json } => show::show(ctx, &dump, json),
        Command::Verify { dump } => verify::verify(ctx, &dump),
        Command::Fingerprint { dump } => fingerprint::fingerprint(ctx, &dump),
        Command::Config => config_cmd::config(ctx),
    }
}

/// Read a JSON dump and rebuild the snapshot it describes.
pub(crate) fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot dump '{}'", path.display()))?;
    let dump = SnapshotDump::from_json(&json)
        .with_context(|| format!("Failed to parse snapshot dump '{}'", path.display()))?;
    let snapshot = dump
        .into_snapshot()
        .with_context(|| format!("Snapshot dump '{}' is not a valid catalog", path.display()))?;
    debug!(path = %path.display(), databases = snapshot.database_count(), "loaded snapshot dump");
    Ok(snapshot)
}
