//! verify command - Check a snapshot dump against the catalog invariants

use std::path::Path;

use anyhow::{bail, Result};

use crate::catalog::verify_snapshot;
use crate::cli::Context;

use super::load_snapshot;

/// Verify a snapshot dump, failing when any invariant is violated.
pub fn verify(_ctx: &Context, dump: &Path) -> Result<()> {
    let snapshot = load_snapshot(dump)?;
    let result = verify_snapshot(&snapshot);

    if result.ok {
        println!("ok: {} satisfies all catalog invariants", dump.display());
        return Ok(());
    }

    for error in &result.errors {
        println!("violation: {error}");
    }
    bail!(
        "{} invariant violation(s) in '{}'",
        result.errors.len(),
        dump.display()
    )
}
