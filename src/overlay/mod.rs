//! overlay
//!
//! Copy-on-write change sets over one base snapshot.
//!
//! # Architecture
//!
//! A [`SnapshotOverlay`] keeps three things:
//!
//! - the base snapshot it was opened on, never modified
//! - a working copy of that snapshot, cloned shallowly and copied only along
//!   the paths the writer touches
//! - a [`ChangeSet`] tagging every element the writer added, modified, or
//!   removed
//!
//! Reads go to the working copy, so a writer sees its own changes
//! immediately while nobody else does. The merge engine reads the change set
//! to decide what to fold into the committed snapshot.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use docpart_catalog::catalog::Snapshot;
//! use docpart_catalog::overlay::SnapshotOverlay;
//!
//! let mut overlay = SnapshotOverlay::new(Arc::new(Snapshot::empty()), 0);
//! overlay.add_database("d", "d_id")?.add_collection("c", "c_id")?;
//!
//! let db = overlay.database_by_name("d").unwrap();
//! assert!(db.collection_by_identifier("c_id").is_some());
//! # Ok::<(), docpart_catalog::catalog::CatalogError>(())
//! ```

pub mod changes;
pub mod handles;

use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::error::{CatalogError, ElementKind, ElementPath};
use crate::catalog::snapshot::{clash_error, Database, Snapshot};
pub use changes::{
    ChangeRecord, ChangeSet, ChangeTag, CollectionChanges, DatabaseChanges, DocPartChanges, SiblingChanges,
};
use changes::{ensure_not_removed, mark_added, mark_modified, mark_removed};
pub use handles::{CollectionMut, DatabaseMut, DocPartIndexMut, DocPartMut, IndexMut};

/// A writer's private, uncommitted view of the catalog.
#[derive(Debug, Clone)]
pub struct SnapshotOverlay {
    id: Uuid,
    base: Arc<Snapshot>,
    base_version: u64,
    working: Snapshot,
    changes: ChangeSet,
}

impl SnapshotOverlay {
    /// Open an overlay on `base`, the committed snapshot at `base_version`.
    pub fn new(base: Arc<Snapshot>, base_version: u64) -> Self {
        let working = (*base).clone();
        Self {
            id: Uuid::new_v4(),
            base,
            base_version,
            working,
            changes: ChangeSet::default(),
        }
    }

    /// Unique id of this overlay, reused as the merge id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The snapshot the overlay was opened on.
    pub fn base(&self) -> &Arc<Snapshot> {
        &self.base
    }

    /// Committed version of the base snapshot.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// The overlay's view: base plus every change so far.
    pub fn snapshot(&self) -> &Snapshot {
        &self.working
    }

    /// Recorded change tags.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Whether the overlay changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Flatten into an independent snapshot.
    ///
    /// Does not touch the repository.
    pub fn materialize(&self) -> Snapshot {
        self.working.clone()
    }

    /// Look up a database by name.
    pub fn database_by_name(&self, name: &str) -> Option<&Database> {
        self.working.database_by_name(name)
    }

    /// Look up a database by identifier.
    pub fn database_by_identifier(&self, identifier: &str) -> Option<&Database> {
        self.working.database_by_identifier(identifier)
    }

    /// Databases in identifier order.
    pub fn databases(&self) -> impl Iterator<Item = &Database> {
        self.working.databases()
    }

    /// Add an empty database.
    pub fn add_database(
        &mut self,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<DatabaseMut<'_>, CatalogError> {
        let database = Database::new(name, identifier);
        let (name, identifier) = (
            database.name().to_string(),
            database.identifier().to_string(),
        );
        ensure_not_removed(&self.changes.databases, &identifier, ElementKind::Database, &name)?;

        let Self { working, changes, .. } = self;
        let database = working
            .databases_mut()
            .insert(database)
            .map_err(|clash| clash_error(clash, ElementKind::Database, name, identifier.clone(), ElementPath::root()))?;
        let changes = mark_added(&mut changes.databases, &identifier);
        Ok(DatabaseMut::new(database, changes))
    }

    /// Mutable handle on an existing database.
    pub fn database_mut(&mut self, name: &str) -> Result<DatabaseMut<'_>, CatalogError> {
        let identifier = self
            .working
            .database_by_name(name)
            .map(|db| db.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::Database, name, ElementPath::root()))?;

        let Self { working, changes, .. } = self;
        let database = working
            .databases_mut()
            .get_mut(&identifier)
            .ok_or_else(|| missing(ElementKind::Database, &identifier, ElementPath::root()))?;
        let changes = mark_modified(&mut changes.databases, &identifier);
        Ok(DatabaseMut::new(database, changes))
    }

    /// Remove a database and everything in it.
    pub fn remove_database(&mut self, name: &str) -> Result<(), CatalogError> {
        let identifier = self
            .working
            .database_by_name(name)
            .map(|db| db.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::Database, name, ElementPath::root()))?;
        self.working.databases_mut().remove(&identifier);
        mark_removed(&mut self.changes.databases, &identifier);
        Ok(())
    }
}

pub(crate) fn missing(kind: ElementKind, key: impl ToString, parent: ElementPath) -> CatalogError {
    CatalogError::NotFound {
        kind,
        key: key.to_string(),
        parent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TableRef;

    #[test]
    fn reads_see_own_writes_only() {
        let base = Arc::new(Snapshot::empty());
        let mut overlay = SnapshotOverlay::new(Arc::clone(&base), 0);
        overlay
            .add_database("d", "id")
            .unwrap()
            .add_collection("c", "cid")
            .unwrap();

        let db = overlay.database_by_name("d").unwrap();
        assert!(db.collection_by_identifier("cid").is_some());
        assert!(base.is_empty());
        assert!(overlay.has_changes());
    }

    #[test]
    fn materialize_is_independent() {
        let mut overlay = SnapshotOverlay::new(Arc::new(Snapshot::empty()), 0);
        overlay.add_database("d", "d_id").unwrap();
        let frozen = overlay.materialize();

        overlay.add_database("e", "e_id").unwrap();
        assert_eq!(frozen.database_count(), 1);
        assert_eq!(overlay.snapshot().database_count(), 2);
    }

    #[test]
    fn removing_an_added_database_leaves_no_trace() {
        let mut overlay = SnapshotOverlay::new(Arc::new(Snapshot::empty()), 0);
        overlay.add_database("d", "d_id").unwrap();
        overlay.remove_database("d").unwrap();
        assert!(!overlay.has_changes());
        assert!(overlay.changes().databases.is_empty());

        let err = overlay.remove_database("d").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn removed_database_cannot_be_added_back() {
        let mut seed = SnapshotOverlay::new(Arc::new(Snapshot::empty()), 0);
        seed.add_database("d", "d_id").unwrap();

        let mut overlay = SnapshotOverlay::new(Arc::new(seed.materialize()), 1);
        overlay.remove_database("d").unwrap();
        assert_eq!(
            overlay.changes().databases["d_id"].tag,
            ChangeTag::Removed
        );
        let err = overlay.add_database("d", "d_id").unwrap_err();
        assert!(matches!(err, CatalogError::RemovedInOverlay { .. }));

        // A fresh identifier under the old name is a different database.
        overlay.add_database("d", "d_id2").unwrap();
    }

    #[test]
    fn untouched_handles_record_nothing_effective() {
        let mut seed = SnapshotOverlay::new(Arc::new(Snapshot::empty()), 0);
        seed.add_database("d", "d_id")
            .unwrap()
            .add_collection("c", "c_id")
            .unwrap()
            .add_doc_part(TableRef::root(), "c_root")
            .unwrap();

        let mut overlay = SnapshotOverlay::new(Arc::new(seed.materialize()), 1);
        overlay
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .doc_part_mut(&TableRef::root())
            .unwrap();
        assert!(!overlay.has_changes());
        assert_eq!(overlay.changes().count(), 0);
        assert_eq!(overlay.base_version(), 1);
    }
}
