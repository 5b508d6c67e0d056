//! engine
//!
//! Owns the committed snapshot and orders the merges into it.
//!
//! # Architecture
//!
//! Readers and writers go through stages opened on a [`Repository`]:
//!
//! ```text
//! open_snapshot_stage -> new_overlay -> edit -> open_merger_stage -> commit
//!                                                      |
//!                                                      +-> MergeConflict
//! ```
//!
//! 1. **Snapshot stage**: pins the committed snapshot, hands out overlays
//! 2. **Overlay**: private working copy, edited without any lock
//! 3. **Merger stage**: takes the merge lock and merges the overlay into
//!    whatever is committed by then
//! 4. **Publish**: swaps the merged snapshot in and bumps the version
//!
//! # Invariants
//!
//! - At most one merger stage is open at any time
//! - A rejected merge never changes the committed snapshot
//! - Opening a snapshot stage never waits for a merge to finish
//! - Every closed merger stage leaves one event in the [`MergeLedger`]

pub mod ledger;
pub mod repository;
pub mod stage;

pub use ledger::{MergeEvent, MergeLedger};
pub use repository::Repository;
pub use stage::{MergerStage, SnapshotStage};
