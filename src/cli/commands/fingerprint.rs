//! fingerprint command - Print the content hash of a snapshot dump

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;

use super::load_snapshot;

/// Print the SHA-256 fingerprint of the canonical form of a dump.
///
/// Dumps that differ only in element order or whitespace share a
/// fingerprint.
pub fn fingerprint(_ctx: &Context, dump: &Path) -> Result<()> {
    let snapshot = load_snapshot(dump)?;
    let fingerprint = snapshot
        .fingerprint()
        .context("Failed to compute fingerprint")?;
    println!("{fingerprint}");
    Ok(())
}
