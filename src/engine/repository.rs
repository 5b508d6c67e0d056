//! engine::repository
//!
//! The committed catalog and the stages that read and change it.
//!
//! # Concurrency
//!
//! The committed snapshot and its version live in one [`ArcSwap`] cell.
//! Readers load it atomically and never block, not even while a merge is
//! published. Merges are serialized by a separate mutex that a
//! [`MergerStage`] holds for its whole life, and only the lock holder stores
//! into the cell.
//!
//! # Example
//!
//! ```
//! use docpart_catalog::engine::Repository;
//!
//! let repository = Repository::new();
//! let mut overlay = repository.open_snapshot_stage().new_overlay();
//! overlay.add_database("db", "db_id").unwrap();
//!
//! repository.merge(overlay).unwrap();
//! assert_eq!(repository.current_version(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::error::CatalogError;
use crate::catalog::snapshot::Snapshot;
use crate::catalog::verify::verify_snapshot;
use crate::core::config::MergeConfig;
use crate::merge::SnapshotMerger;
use crate::overlay::SnapshotOverlay;

use super::ledger::{MergeEvent, MergeLedger};
use super::stage::{MergerStage, SnapshotStage};

/// Strategy name recorded when the verifier rejects a merged snapshot.
const VERIFY: &str = "verify";

#[derive(Debug)]
struct Committed {
    snapshot: Arc<Snapshot>,
    version: u64,
}

/// Owner of the committed catalog snapshot.
pub struct Repository {
    committed: ArcSwap<Committed>,
    merge_lock: Mutex<()>,
    ledger: MergeLedger,
    config: MergeConfig,
}

impl Repository {
    /// An empty catalog at version 0.
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::empty())
    }

    /// Start from an existing snapshot, e.g. one loaded from storage.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::with_config(snapshot, MergeConfig::default())
    }

    /// Start from `snapshot` with explicit merge settings.
    pub fn with_config(snapshot: Snapshot, config: MergeConfig) -> Self {
        Self {
            committed: ArcSwap::from_pointee(Committed {
                snapshot: Arc::new(snapshot),
                version: 0,
            }),
            merge_lock: Mutex::new(()),
            ledger: MergeLedger::new(config.ledger_capacity),
            config,
        }
    }

    /// Capture the committed snapshot.
    pub fn open_snapshot_stage(&self) -> SnapshotStage {
        let committed = self.committed.load();
        SnapshotStage::new(Arc::clone(&committed.snapshot), committed.version)
    }

    /// Take the merge lock and merge `overlay` into the committed snapshot.
    ///
    /// Blocks while another merger stage is open. On success the returned
    /// stage keeps the lock until it is committed, discarded or dropped.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Conflict`] if a strategy rejected the overlay
    /// - [`CatalogError::Verification`] if `verify_after_merge` is set and
    ///   the merged snapshot breaks a catalog invariant
    ///
    /// The lock is released before either error is returned.
    pub fn open_merger_stage(&self, overlay: SnapshotOverlay) -> Result<MergerStage<'_>, CatalogError> {
        let lock = self.merge_lock.lock();
        let committed = self.committed.load_full();
        debug!(
            merge_id = %overlay.id(),
            base_version = overlay.base_version(),
            committed_version = committed.version,
            "opened merger stage"
        );

        let merged = match SnapshotMerger::new(&committed.snapshot, &overlay).merge() {
            Ok(merged) => merged,
            Err(conflict) => {
                debug!(merge_id = %overlay.id(), strategy = %conflict.strategy(), "merge rejected");
                self.ledger.append(MergeEvent::rejected(
                    overlay.id(),
                    overlay.base_version(),
                    conflict.strategy().as_str(),
                    conflict.to_string(),
                ));
                return Err(conflict.into());
            }
        };

        if self.config.verify_after_merge {
            let result = verify_snapshot(&merged);
            if !result.ok {
                let reason = result
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                debug!(merge_id = %overlay.id(), violations = result.errors.len(), "merged snapshot failed verification");
                self.ledger.append(MergeEvent::rejected(
                    overlay.id(),
                    overlay.base_version(),
                    VERIFY,
                    reason.clone(),
                ));
                return Err(CatalogError::Verification(reason));
            }
        }

        Ok(MergerStage::new(self, lock, merged, &overlay))
    }

    /// Merge `overlay` and publish the result.
    pub fn merge(&self, overlay: SnapshotOverlay) -> Result<Arc<Snapshot>, CatalogError> {
        Ok(self.open_merger_stage(overlay)?.commit())
    }

    /// Number of publishes so far.
    pub fn current_version(&self) -> u64 {
        self.committed.load().version
    }

    /// Recent merge outcomes.
    pub fn ledger(&self) -> &MergeLedger {
        &self.ledger
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub(super) fn committed_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.committed.load().snapshot)
    }

    /// Swap in a merged snapshot. Callers hold the merge lock.
    pub(super) fn publish(&self, snapshot: Arc<Snapshot>, merge_id: Uuid, base_version: u64, changes: usize) {
        let version = self.committed.load().version + 1;
        self.committed.store(Arc::new(Committed { snapshot, version }));
        self.ledger
            .append(MergeEvent::committed(merge_id, base_version, version, changes));
        info!(%merge_id, version, changes, "published merged snapshot");
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("version", &self.current_version())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::SnapshotBuilder;
    use crate::catalog::doc_part::{DocPart, Field};
    use crate::catalog::index::Index;
    use crate::catalog::snapshot::{Collection, Database};
    use crate::core::types::{FieldIndexOrdering, FieldType, TableRef};

    #[test]
    fn stage_pins_snapshot_across_publish() {
        let repository = Repository::new();
        let before = repository.open_snapshot_stage();

        let mut overlay = before.new_overlay();
        overlay.add_database("d", "d_id").unwrap();
        repository.merge(overlay).unwrap();

        assert!(before.current_snapshot().database_by_name("d").is_none());
        assert_eq!(before.version(), 0);

        let after = repository.open_snapshot_stage();
        assert!(after.current_snapshot().database_by_name("d").is_some());
        assert_eq!(after.version(), 1);
    }

    #[test]
    fn discard_leaves_committed_snapshot() {
        let repository = Repository::new();
        let mut overlay = repository.open_snapshot_stage().new_overlay();
        overlay.add_database("d", "d_id").unwrap();

        let stage = repository.open_merger_stage(overlay).unwrap();
        assert!(stage.merged_snapshot().is_some());
        stage.discard();

        assert_eq!(repository.current_version(), 0);
        assert!(repository.open_snapshot_stage().current_snapshot().is_empty());
        assert_eq!(repository.ledger().last().map(|e| e.event_type()), Some("discarded"));
    }

    #[test]
    fn dropping_a_stage_publishes() {
        let repository = Repository::new();
        let mut overlay = repository.open_snapshot_stage().new_overlay();
        overlay.add_database("d", "d_id").unwrap();

        {
            let _stage = repository.open_merger_stage(overlay).unwrap();
        }

        assert_eq!(repository.current_version(), 1);
        assert!(matches!(
            repository.ledger().last(),
            Some(MergeEvent::Committed { version: 1, changes: 1, .. })
        ));
    }

    #[test]
    fn conflict_releases_lock_and_is_recorded() {
        let repository = Repository::new();
        let stage = repository.open_snapshot_stage();
        let mut first = stage.new_overlay();
        first.add_database("d", "a").unwrap();
        let mut second = stage.new_overlay();
        second.add_database("d", "b").unwrap();

        repository.merge(first).unwrap();
        let err = repository.merge(second).unwrap_err();
        assert_eq!(
            err.as_conflict().map(|c| c.strategy().as_str()),
            Some("database.same_name")
        );

        // The lock is free again.
        let empty = repository.open_snapshot_stage().new_overlay();
        repository.merge(empty).unwrap();
        assert_eq!(repository.current_version(), 2);

        let kinds: Vec<_> = repository.ledger().events().iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, ["committed", "rejected", "committed"]);
    }

    #[test]
    fn readers_see_snapshot_and_version_together() {
        const MERGES: u64 = 50;
        let repository = Repository::new();

        std::thread::scope(|scope| {
            let repo = &repository;
            scope.spawn(move || {
                for i in 0..MERGES {
                    let mut overlay = repo.open_snapshot_stage().new_overlay();
                    overlay.add_database(format!("d{i}"), format!("d_id{i}")).unwrap();
                    repo.merge(overlay).unwrap();
                }
            });
            scope.spawn(move || loop {
                let stage = repo.open_snapshot_stage();
                assert_eq!(stage.current_snapshot().database_count() as u64, stage.version());
                if stage.version() == MERGES {
                    break;
                }
            });
        });
    }

    fn seed(repository: &Repository) {
        let mut seed = repository.open_snapshot_stage().new_overlay();
        {
            let mut db = seed.add_database("d", "d_id").unwrap();
            let mut col = db.add_collection("c", "c_id").unwrap();
            let mut dp = col.add_doc_part(TableRef::root(), "c_root").unwrap();
            dp.add_field("a", "a_i", FieldType::Integer).unwrap();
            dp.add_doc_part_index("c_root_a", false)
                .unwrap()
                .add_column("a_i", FieldIndexOrdering::Asc)
                .unwrap();
            col.add_index("a_1", false)
                .unwrap()
                .add_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
                .unwrap();
        }
        repository.merge(seed).unwrap();
    }

    /// Two overlays on one stage: the first drops the index together with
    /// its physical index, the second adds an equivalent index relying on
    /// the physical index it still sees.
    fn racing_overlays(repository: &Repository) -> (SnapshotOverlay, SnapshotOverlay) {
        let stage = repository.open_snapshot_stage();
        let mut drop_both = stage.new_overlay();
        {
            let mut db = drop_both.database_mut("d").unwrap();
            let mut col = db.collection_mut("c").unwrap();
            col.doc_part_mut(&TableRef::root())
                .unwrap()
                .remove_doc_part_index("c_root_a")
                .unwrap();
            col.remove_index("a_1").unwrap();
        }
        let mut add_twin = stage.new_overlay();
        add_twin
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .add_index("a_2", false)
            .unwrap()
            .add_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
            .unwrap();
        (drop_both, add_twin)
    }

    #[test]
    fn racing_coupling_change_is_rejected() {
        let repository = Repository::new();
        seed(&repository);
        let (drop_both, add_twin) = racing_overlays(&repository);

        repository.merge(drop_both).unwrap();
        let before = repository.committed_snapshot();
        let err = repository.merge(add_twin).unwrap_err();

        assert_eq!(
            err.as_conflict().map(|c| c.strategy().as_str()),
            Some("index.missing_doc_part_index")
        );
        assert!(err.to_string().contains("a_2"));
        assert!(Arc::ptr_eq(&before, &repository.committed_snapshot()));
        assert!(verify_snapshot(&before).ok);
    }

    /// Index `a_1` over `a` with no physical index behind it.
    fn uncoupled_seed() -> Snapshot {
        let mut builder = SnapshotBuilder::new();
        let col = builder
            .insert_database(Database::new("d", "d_id"))
            .unwrap()
            .insert_collection(Collection::new("c", "c_id"))
            .unwrap();
        col.insert_doc_part(DocPart::new(TableRef::root(), "c_root"))
            .unwrap()
            .insert_field(Field::new("a", "a_i", FieldType::Integer))
            .unwrap();
        let mut index = Index::new("a_1", false);
        index
            .push_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
            .unwrap();
        col.insert_index(index).unwrap();
        builder.build()
    }

    fn unrelated_overlay(repository: &Repository) -> SnapshotOverlay {
        let mut overlay = repository.open_snapshot_stage().new_overlay();
        overlay.add_database("e", "e_id").unwrap();
        overlay
    }

    #[test]
    fn verification_rejects_broken_snapshot() {
        let config = MergeConfig {
            verify_after_merge: true,
            ..MergeConfig::default()
        };
        let repository = Repository::with_config(uncoupled_seed(), config);

        let err = repository.merge(unrelated_overlay(&repository)).unwrap_err();
        assert!(matches!(err, CatalogError::Verification(_)));
        assert!(err.to_string().contains("a_1"));
        assert_eq!(repository.current_version(), 0);
        assert!(matches!(
            repository.ledger().last(),
            Some(MergeEvent::Rejected { ref strategy, .. }) if strategy == "verify"
        ));
    }

    #[test]
    fn verification_is_off_by_default() {
        let repository = Repository::from_snapshot(uncoupled_seed());

        let merged = repository.merge(unrelated_overlay(&repository)).unwrap();
        assert!(merged.database_by_name("e").is_some());
        assert!(!verify_snapshot(&merged).ok);
    }
}
