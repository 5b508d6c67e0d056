//! engine::stage
//!
//! Scoped handles on a [`Repository`](super::Repository).
//!
//! # Snapshot stages
//!
//! A [`SnapshotStage`] pins the committed snapshot current when it was
//! opened. Any number may be open at once and none of them ever waits for a
//! merge.
//!
//! # Merger stages
//!
//! A [`MergerStage`] holds the repository's merge lock for its whole life,
//! so at most one exists at a time. It is only handed out once its overlay
//! merged cleanly, and closing it decides the outcome:
//!
//! ```text
//! commit()  -> publish, release lock
//! drop      -> publish, release lock (discard instead while panicking)
//! discard() -> release lock
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::snapshot::Snapshot;
use crate::overlay::SnapshotOverlay;

use super::ledger::MergeEvent;
use super::repository::Repository;

/// Read-only view of one committed snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStage {
    snapshot: Arc<Snapshot>,
    version: u64,
}

impl SnapshotStage {
    pub(super) fn new(snapshot: Arc<Snapshot>, version: u64) -> Self {
        debug!(version, "opened snapshot stage");
        Self { snapshot, version }
    }

    /// The snapshot captured at open time.
    pub fn current_snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Committed version the stage was opened at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start a fresh overlay on the captured snapshot.
    pub fn new_overlay(&self) -> SnapshotOverlay {
        SnapshotOverlay::new(Arc::clone(&self.snapshot), self.version)
    }
}

/// Exclusive handle on a merge that is ready to publish.
#[must_use = "dropping a merger stage publishes its snapshot"]
pub struct MergerStage<'r> {
    repository: &'r Repository,
    merged: Option<Arc<Snapshot>>,
    merge_id: Uuid,
    base_version: u64,
    changes: usize,
    // Dropped last, after Drop::drop has published.
    _lock: MutexGuard<'r, ()>,
}

impl<'r> MergerStage<'r> {
    pub(super) fn new(
        repository: &'r Repository,
        lock: MutexGuard<'r, ()>,
        merged: Snapshot,
        overlay: &SnapshotOverlay,
    ) -> Self {
        Self {
            repository,
            merged: Some(Arc::new(merged)),
            merge_id: overlay.id(),
            base_version: overlay.base_version(),
            changes: overlay.changes().count(),
            _lock: lock,
        }
    }

    /// The snapshot that will be published.
    pub fn merged_snapshot(&self) -> Option<&Snapshot> {
        self.merged.as_deref()
    }

    /// Id of the merged overlay.
    pub fn merge_id(&self) -> Uuid {
        self.merge_id
    }

    /// Publish the merged snapshot and release the merge lock.
    pub fn commit(mut self) -> Arc<Snapshot> {
        match self.merged.take() {
            Some(merged) => {
                self.publish(Arc::clone(&merged));
                merged
            }
            // Only reachable through a stage that was already closed.
            None => self.repository.committed_snapshot(),
        }
    }

    /// Release the merge lock without publishing.
    pub fn discard(mut self) {
        self.close_without_publishing();
    }

    fn publish(&self, merged: Arc<Snapshot>) {
        self.repository
            .publish(merged, self.merge_id, self.base_version, self.changes);
    }

    fn close_without_publishing(&mut self) {
        if self.merged.take().is_some() {
            debug!(merge_id = %self.merge_id, "discarded merged snapshot");
            self.repository
                .ledger()
                .append(MergeEvent::discarded(self.merge_id, self.base_version));
        }
    }
}

impl Drop for MergerStage<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.close_without_publishing();
        } else if let Some(merged) = self.merged.take() {
            self.publish(merged);
        }
    }
}

impl fmt::Debug for MergerStage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergerStage")
            .field("merge_id", &self.merge_id)
            .field("base_version", &self.base_version)
            .field("changes", &self.changes)
            .field("pending", &self.merged.is_some())
            .finish()
    }
}
