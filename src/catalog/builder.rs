//! catalog::builder
//!
//! Builder producing new snapshot versions.
//!
//! The builder either starts empty (a loader rebuilding the catalog at
//! startup) or from an existing snapshot (the merger folding in an overlay).
//! Starting from a snapshot is a shallow clone; only the elements reached
//! through the `*_mut` accessors get copied.

use super::error::{CatalogError, ElementKind, ElementPath};
use super::snapshot::{clash_error, Database, Snapshot};

/// Builder for a [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    /// Start from the empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a copy of `snapshot`.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            snapshot: snapshot.clone(),
        }
    }

    /// The snapshot under construction.
    pub fn view(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Add a database.
    pub fn insert_database(&mut self, database: Database) -> Result<&mut Database, CatalogError> {
        let (name, identifier) = (
            database.name().to_string(),
            database.identifier().to_string(),
        );
        self.snapshot
            .databases_mut()
            .insert(database)
            .map_err(|clash| clash_error(clash, ElementKind::Database, name, identifier, ElementPath::root()))
    }

    /// Mutable access to a database.
    pub fn database_mut(&mut self, identifier: &str) -> Option<&mut Database> {
        self.snapshot.databases_mut().get_mut(identifier)
    }

    /// Remove a database by identifier.
    pub fn remove_database(&mut self, identifier: &str) -> Option<Database> {
        self.snapshot
            .databases_mut()
            .remove(identifier)
            .map(super::doc_part::unwrap_or_clone)
    }

    /// Finish building.
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::snapshot::Collection;

    #[test]
    fn builds_from_empty() {
        let mut builder = SnapshotBuilder::new();
        builder
            .insert_database(Database::new("d", "d_id"))
            .unwrap()
            .insert_collection(Collection::new("c", "c_id"))
            .unwrap();

        let snapshot = builder.build();
        assert_eq!(snapshot.database_count(), 1);
        assert!(snapshot
            .database_by_name("d")
            .unwrap()
            .collection_by_identifier("c_id")
            .is_some());
    }

    #[test]
    fn extending_leaves_source_untouched() {
        let mut builder = SnapshotBuilder::new();
        builder.insert_database(Database::new("d", "d_id")).unwrap();
        let first = builder.build();

        let mut builder = SnapshotBuilder::from_snapshot(&first);
        builder.insert_database(Database::new("e", "e_id")).unwrap();
        builder
            .database_mut("d_id")
            .unwrap()
            .insert_collection(Collection::new("c", "c_id"))
            .unwrap();
        let second = builder.build();

        assert_eq!(first.database_count(), 1);
        assert!(first
            .database_by_identifier("d_id")
            .unwrap()
            .collection_by_name("c")
            .is_none());
        assert_eq!(second.database_count(), 2);
    }

    #[test]
    fn duplicate_database_rejected() {
        let mut builder = SnapshotBuilder::new();
        builder.insert_database(Database::new("d", "d_id")).unwrap();
        let err = builder
            .insert_database(Database::new("d", "other"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));
        assert!(builder.remove_database("d_id").is_some());
        assert!(builder.view().is_empty());
    }
}
