//! merge::merger
//!
//! Folds an overlay into the current committed snapshot.
//!
//! # Architecture
//!
//! The merger starts a [`SnapshotBuilder`] from the committed snapshot and
//! walks the overlay's change set top-down:
//!
//! ```text
//! database -> collection -> indexes
//!                        -> doc parts -> fields, scalars, doc part indexes
//! ```
//!
//! At each level removals run before additions and modifications, so a name
//! freed by the overlay can be reused in the same merge. Within a collection
//! indexes run before doc parts, so index conflicts take precedence. Doc
//! parts are added parents first and removed children first.
//!
//! Every changed element is handed to the strategy family for its kind; the
//! first rejection aborts the merge and the builder is dropped. Once all of a
//! collection's changes are in, the folded collection goes through the
//! [coupling checks](super::coupling), which see what concurrent merges
//! committed in the meantime.
//!
//! # Invariants
//!
//! - Neither the committed snapshot nor the overlay is modified
//! - The result is returned only if every change was accepted

use crate::catalog::builder::SnapshotBuilder;
use crate::catalog::doc_part::DocPart;
use crate::catalog::error::{ElementKind, ElementPath};
use crate::catalog::snapshot::{Collection, Database, Snapshot};
use crate::overlay::{
    ChangeRecord, ChangeTag, CollectionChanges, DatabaseChanges, DocPartChanges, SnapshotOverlay,
};

use super::conflict::{ConflictReason, MergeConflict, StrategyId};
use super::coupling;
use super::strategies::{
    CollectionMergeStrategy, CollectionRemoveStrategy, DatabaseMergeStrategy, DatabaseRemoveStrategy,
    DocPartIndexMergeStrategy, DocPartIndexRemoveStrategy, DocPartMergeStrategy, DocPartRemoveStrategy,
    FieldMergeStrategy, FieldRemoveStrategy, IndexMergeStrategy, IndexRemoveStrategy, ScalarMergeStrategy,
    ScalarRemoveStrategy,
};
use super::strategy::{apply, DocPartScope, MergeContext};

const MERGER: StrategyId = StrategyId::new("merger");

/// One element as seen by the committed snapshot, the overlay's base, and
/// the overlay itself.
struct Versions<'a, T> {
    committed: Option<&'a T>,
    base: Option<&'a T>,
    working: &'a T,
}

impl<T> Clone for Versions<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Versions<'_, T> {}

/// Merges one overlay into one committed snapshot.
pub struct SnapshotMerger<'a> {
    committed: &'a Snapshot,
    overlay: &'a SnapshotOverlay,
}

impl<'a> SnapshotMerger<'a> {
    pub fn new(committed: &'a Snapshot, overlay: &'a SnapshotOverlay) -> Self {
        Self { committed, overlay }
    }

    /// Produce the merged snapshot, or the first conflict.
    pub fn merge(&self) -> Result<Snapshot, MergeConflict> {
        let mut builder = SnapshotBuilder::from_snapshot(self.committed);
        let records = &self.overlay.changes().databases;
        let base = self.overlay.base().as_ref();
        let working = self.overlay.snapshot();
        let path = ElementPath::root();

        for (id, _) in removals(records) {
            let changed = base
                .database_by_identifier(id)
                .ok_or_else(|| untracked(&path, ElementKind::Database, id))?;
            let ctx = MergeContext {
                committed_parent: Some(self.committed),
                uncommitted_parent: working,
                changed,
                tag: ChangeTag::Removed,
                siblings: records,
                path: &path,
            };
            apply::<DatabaseRemoveStrategy>(&ctx, &mut builder)?;
        }

        for (id, record) in upserts(records) {
            let changed = working
                .database_by_identifier(id)
                .ok_or_else(|| untracked(&path, ElementKind::Database, id))?;
            let ctx = MergeContext {
                committed_parent: Some(self.committed),
                uncommitted_parent: working,
                changed,
                tag: record.tag,
                siblings: records,
                path: &path,
            };
            apply::<DatabaseMergeStrategy>(&ctx, &mut builder)?;

            let target = builder
                .database_mut(id)
                .ok_or_else(|| untracked(&path, ElementKind::Database, id))?;
            let database = Versions {
                committed: self.committed.database_by_identifier(id),
                base: base.database_by_identifier(id),
                working: changed,
            };
            merge_database(database, record, target, &path.child(changed.name()))?;
        }

        Ok(builder.build())
    }
}

fn merge_database(
    database: Versions<'_, Database>,
    record: &DatabaseChanges,
    target: &mut Database,
    path: &ElementPath,
) -> Result<(), MergeConflict> {
    let records = &record.collections;

    for (id, _) in removals(records) {
        let changed = database
            .base
            .and_then(|db| db.collection_by_identifier(id))
            .ok_or_else(|| untracked(path, ElementKind::Collection, id))?;
        let ctx = MergeContext {
            committed_parent: database.committed,
            uncommitted_parent: database.working,
            changed,
            tag: ChangeTag::Removed,
            siblings: records,
            path,
        };
        apply::<CollectionRemoveStrategy>(&ctx, target)?;
    }

    for (id, record) in upserts(records) {
        let changed = database
            .working
            .collection_by_identifier(id)
            .ok_or_else(|| untracked(path, ElementKind::Collection, id))?;
        let ctx = MergeContext {
            committed_parent: database.committed,
            uncommitted_parent: database.working,
            changed,
            tag: record.tag,
            siblings: records,
            path,
        };
        apply::<CollectionMergeStrategy>(&ctx, target)?;

        let collection_target = target
            .collection_mut(id)
            .ok_or_else(|| untracked(path, ElementKind::Collection, id))?;
        let collection = Versions {
            committed: database.committed.and_then(|db| db.collection_by_identifier(id)),
            base: database.base.and_then(|db| db.collection_by_identifier(id)),
            working: changed,
        };
        merge_collection(collection, record, collection_target, &path.child(changed.name()))?;
    }

    Ok(())
}

fn merge_collection(
    collection: Versions<'_, Collection>,
    record: &CollectionChanges,
    target: &mut Collection,
    path: &ElementPath,
) -> Result<(), MergeConflict> {
    let indexes = &record.indexes;

    for (name, _) in removals(indexes) {
        let changed = collection
            .base
            .and_then(|c| c.index_by_name(name))
            .ok_or_else(|| untracked(path, ElementKind::Index, name))?;
        let ctx = MergeContext {
            committed_parent: collection.committed,
            uncommitted_parent: collection.working,
            changed,
            tag: ChangeTag::Removed,
            siblings: indexes,
            path,
        };
        apply::<IndexRemoveStrategy>(&ctx, target)?;
    }

    for (name, tag) in upserts(indexes) {
        let changed = collection
            .working
            .index_by_name(name)
            .ok_or_else(|| untracked(path, ElementKind::Index, name))?;
        let ctx = MergeContext {
            committed_parent: collection.committed,
            uncommitted_parent: collection.working,
            changed,
            tag: *tag,
            siblings: indexes,
            path,
        };
        apply::<IndexMergeStrategy>(&ctx, target)?;
    }

    let doc_parts = &record.doc_parts;

    let mut removed = removals(doc_parts)
        .map(|(id, _)| {
            collection
                .base
                .and_then(|c| c.doc_part_by_identifier(id))
                .ok_or_else(|| untracked(path, ElementKind::DocPart, id))
        })
        .collect::<Result<Vec<_>, _>>()?;
    removed.sort_by(|a, b| b.table_ref().cmp(a.table_ref()));
    for changed in removed {
        let ctx = MergeContext {
            committed_parent: collection.committed,
            uncommitted_parent: collection.working,
            changed,
            tag: ChangeTag::Removed,
            siblings: doc_parts,
            path,
        };
        apply::<DocPartRemoveStrategy>(&ctx, target)?;
    }

    let mut changed_parts = upserts(doc_parts)
        .map(|(id, record)| {
            collection
                .working
                .doc_part_by_identifier(id)
                .map(|dp| (dp, record))
                .ok_or_else(|| untracked(path, ElementKind::DocPart, id))
        })
        .collect::<Result<Vec<_>, _>>()?;
    changed_parts.sort_by(|(a, _), (b, _)| a.table_ref().cmp(b.table_ref()));
    for (changed, record) in changed_parts {
        let ctx = MergeContext {
            committed_parent: collection.committed,
            uncommitted_parent: collection.working,
            changed,
            tag: record.tag,
            siblings: doc_parts,
            path,
        };
        apply::<DocPartMergeStrategy>(&ctx, target)?;

        let id = changed.identifier();
        let doc_part_target = target
            .doc_part_mut(id)
            .ok_or_else(|| untracked(path, ElementKind::DocPart, id))?;
        let doc_part = Versions {
            committed: collection.committed.and_then(|c| c.doc_part_by_identifier(id)),
            base: collection.base.and_then(|c| c.doc_part_by_identifier(id)),
            working: changed,
        };
        merge_doc_part(
            collection,
            doc_part,
            record,
            doc_part_target,
            &path.child(changed.table_ref()),
        )?;
    }

    coupling::check_collection(collection.base, record, target, path)
}

fn merge_doc_part(
    collection: Versions<'_, Collection>,
    doc_part: Versions<'_, DocPart>,
    record: &DocPartChanges,
    target: &mut DocPart,
    path: &ElementPath,
) -> Result<(), MergeConflict> {
    let fields = &record.fields;
    for (id, _) in removals(fields) {
        let changed = doc_part
            .base
            .and_then(|dp| dp.field_by_identifier(id))
            .ok_or_else(|| untracked(path, ElementKind::Field, id))?;
        let ctx = MergeContext {
            committed_parent: doc_part.committed,
            uncommitted_parent: doc_part.working,
            changed,
            tag: ChangeTag::Removed,
            siblings: fields,
            path,
        };
        apply::<FieldRemoveStrategy>(&ctx, target)?;
    }
    for (id, tag) in upserts(fields) {
        let changed = doc_part
            .working
            .field_by_identifier(id)
            .ok_or_else(|| untracked(path, ElementKind::Field, id))?;
        let ctx = MergeContext {
            committed_parent: doc_part.committed,
            uncommitted_parent: doc_part.working,
            changed,
            tag: *tag,
            siblings: fields,
            path,
        };
        apply::<FieldMergeStrategy>(&ctx, target)?;
    }

    let scalars = &record.scalars;
    for (id, _) in removals(scalars) {
        let changed = doc_part
            .base
            .and_then(|dp| dp.scalar_by_identifier(id))
            .ok_or_else(|| untracked(path, ElementKind::Scalar, id))?;
        let ctx = MergeContext {
            committed_parent: doc_part.committed,
            uncommitted_parent: doc_part.working,
            changed,
            tag: ChangeTag::Removed,
            siblings: scalars,
            path,
        };
        apply::<ScalarRemoveStrategy>(&ctx, target)?;
    }
    for (id, tag) in upserts(scalars) {
        let changed = doc_part
            .working
            .scalar_by_identifier(id)
            .ok_or_else(|| untracked(path, ElementKind::Scalar, id))?;
        let ctx = MergeContext {
            committed_parent: doc_part.committed,
            uncommitted_parent: doc_part.working,
            changed,
            tag: *tag,
            siblings: scalars,
            path,
        };
        apply::<ScalarMergeStrategy>(&ctx, target)?;
    }

    let committed_scope = collection
        .committed
        .zip(doc_part.committed)
        .map(|(collection, doc_part)| DocPartScope {
            collection,
            doc_part,
        });
    let working_scope = DocPartScope {
        collection: collection.working,
        doc_part: doc_part.working,
    };
    let indexes = &record.indexes;
    for (id, _) in removals(indexes) {
        let changed = doc_part
            .base
            .and_then(|dp| dp.doc_part_index_by_identifier(id))
            .ok_or_else(|| untracked(path, ElementKind::DocPartIndex, id))?;
        let ctx = MergeContext {
            committed_parent: committed_scope,
            uncommitted_parent: working_scope,
            changed,
            tag: ChangeTag::Removed,
            siblings: indexes,
            path,
        };
        apply::<DocPartIndexRemoveStrategy>(&ctx, target)?;
    }
    for (id, tag) in upserts(indexes) {
        let changed = doc_part
            .working
            .doc_part_index_by_identifier(id)
            .ok_or_else(|| untracked(path, ElementKind::DocPartIndex, id))?;
        let ctx = MergeContext {
            committed_parent: committed_scope,
            uncommitted_parent: working_scope,
            changed,
            tag: *tag,
            siblings: indexes,
            path,
        };
        apply::<DocPartIndexMergeStrategy>(&ctx, target)?;
    }

    Ok(())
}

/// Records tagged removed.
fn removals<R: ChangeRecord>(
    records: &std::collections::BTreeMap<String, R>,
) -> impl Iterator<Item = (&str, &R)> {
    records
        .iter()
        .filter(|(_, r)| r.tag() == ChangeTag::Removed)
        .map(|(id, r)| (id.as_str(), r))
}

/// Records tagged added or modified that carry an effective change.
fn upserts<R: ChangeRecord>(
    records: &std::collections::BTreeMap<String, R>,
) -> impl Iterator<Item = (&str, &R)> {
    records
        .iter()
        .filter(|(_, r)| r.tag().is_upsert() && !r.is_noop())
        .map(|(id, r)| (id.as_str(), r))
}

/// A change record with no matching element: the overlay is inconsistent.
fn untracked(path: &ElementPath, kind: ElementKind, key: &str) -> MergeConflict {
    MergeConflict::new(
        MERGER,
        path,
        ConflictReason::Rejected(format!("{kind} '{key}' is tagged but missing from the overlay")),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::types::{FieldIndexOrdering, FieldType, TableRef};

    fn overlay_on(base: &Arc<Snapshot>) -> SnapshotOverlay {
        SnapshotOverlay::new(Arc::clone(base), 0)
    }

    fn seeded() -> Arc<Snapshot> {
        let mut overlay = overlay_on(&Arc::new(Snapshot::empty()));
        {
            let mut db = overlay.add_database("d", "d_id").unwrap();
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
        Arc::new(overlay.materialize())
    }

    fn strategy_of(result: Result<Snapshot, MergeConflict>) -> &'static str {
        result.unwrap_err().strategy().as_str()
    }

    #[test]
    fn empty_overlay_yields_committed_snapshot() {
        let base = seeded();
        let overlay = overlay_on(&base);
        let merged = SnapshotMerger::new(&base, &overlay).merge().unwrap();
        assert_eq!(merged, *base);
        assert!(merged.shares_structure_with(&base));
    }

    #[test]
    fn concurrent_database_with_same_name_conflicts() {
        let empty = Arc::new(Snapshot::empty());
        let mut first = overlay_on(&empty);
        first.add_database("d", "a").unwrap();
        let mut second = overlay_on(&empty);
        second.add_database("d", "b").unwrap();

        let committed = SnapshotMerger::new(&empty, &first).merge().unwrap();
        let result = SnapshotMerger::new(&committed, &second).merge();
        assert_eq!(strategy_of(result), "database.same_name");
    }

    #[test]
    fn identical_concurrent_databases_are_combined() {
        let empty = Arc::new(Snapshot::empty());
        let mut first = overlay_on(&empty);
        first.add_database("d", "d_id").unwrap().add_collection("x", "x_id").unwrap();
        let mut second = overlay_on(&empty);
        second.add_database("d", "d_id").unwrap().add_collection("y", "y_id").unwrap();

        let committed = SnapshotMerger::new(&empty, &first).merge().unwrap();
        let merged = SnapshotMerger::new(&committed, &second).merge().unwrap();
        let db = merged.database_by_name("d").unwrap();
        assert!(db.collection_by_name("x").is_some());
        assert!(db.collection_by_name("y").is_some());
    }

    #[test]
    fn name_freed_in_same_overlay_can_be_reused() {
        let base = seeded();
        let mut overlay = overlay_on(&base);
        overlay.remove_database("d").unwrap();
        overlay.add_database("d", "d_id2").unwrap();

        let merged = SnapshotMerger::new(&base, &overlay).merge().unwrap();
        let db = merged.database_by_name("d").unwrap();
        assert_eq!(db.identifier(), "d_id2");
        assert_eq!(db.collections().count(), 0);
    }

    #[test]
    fn indexed_field_cannot_be_removed() {
        let base = seeded();
        let mut overlay = overlay_on(&base);
        overlay
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .doc_part_mut(&TableRef::root())
            .unwrap()
            .remove_field("a", FieldType::Integer)
            .unwrap();

        let result = SnapshotMerger::new(&base, &overlay).merge();
        assert_eq!(strategy_of(result), "field.in_use");
    }

    #[test]
    fn field_indexed_by_a_concurrent_merge_cannot_be_removed() {
        let seed = seeded();
        let mut with_b = overlay_on(&seed);
        with_b
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .doc_part_mut(&TableRef::root())
            .unwrap()
            .add_field("b", "b_i", FieldType::Integer)
            .unwrap();
        let base = Arc::new(SnapshotMerger::new(&seed, &with_b).merge().unwrap());

        let mut indexer = overlay_on(&base);
        {
            let mut db = indexer.database_mut("d").unwrap();
            let mut col = db.collection_mut("c").unwrap();
            col.doc_part_mut(&TableRef::root())
                .unwrap()
                .add_doc_part_index("c_root_b", false)
                .unwrap()
                .add_column("b_i", FieldIndexOrdering::Asc)
                .unwrap();
            col.add_index("b_1", false)
                .unwrap()
                .add_field(TableRef::root(), "b", FieldIndexOrdering::Asc)
                .unwrap();
        }
        let mut remover = overlay_on(&base);
        remover
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .doc_part_mut(&TableRef::root())
            .unwrap()
            .remove_field("b", FieldType::Integer)
            .unwrap();

        // Each overlay merges cleanly on its own base.
        assert!(SnapshotMerger::new(&base, &remover).merge().is_ok());
        let committed = SnapshotMerger::new(&base, &indexer).merge().unwrap();

        let result = SnapshotMerger::new(&committed, &remover).merge();
        assert_eq!(strategy_of(result), "field.in_use");
    }

    #[test]
    fn modifying_a_concurrently_removed_collection_conflicts() {
        let base = seeded();
        let mut remover = overlay_on(&base);
        remover
            .database_mut("d")
            .unwrap()
            .remove_collection("c")
            .unwrap();
        let mut modifier = overlay_on(&base);
        modifier
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .add_doc_part(TableRef::root().child_object("sub"), "c_sub")
            .unwrap();

        let committed = SnapshotMerger::new(&base, &remover).merge().unwrap();
        let result = SnapshotMerger::new(&committed, &modifier).merge();
        assert_eq!(strategy_of(result), "collection.concurrently_removed");
    }

    #[test]
    fn nested_doc_parts_are_added_parents_first() {
        let empty = Arc::new(Snapshot::empty());
        let mut overlay = overlay_on(&empty);
        {
            let mut db = overlay.add_database("d", "d_id").unwrap();
            let mut col = db.add_collection("c", "c_id").unwrap();
            // Identifier order is the reverse of nesting order.
            col.add_doc_part(TableRef::root(), "z_root").unwrap();
            let child = TableRef::root().child_object("a");
            col.add_doc_part(child.clone(), "m_a").unwrap();
            col.add_doc_part(child.child_array(1), "a_a1").unwrap();
        }

        let merged = SnapshotMerger::new(&empty, &overlay).merge().unwrap();
        assert_eq!(merged, overlay.materialize());
    }

    #[test]
    fn rejected_merge_leaves_inputs_untouched() {
        let base = seeded();
        let mut overlay = overlay_on(&base);
        overlay
            .database_mut("d")
            .unwrap()
            .collection_mut("c")
            .unwrap()
            .remove_index("a_1")
            .unwrap();

        let result = SnapshotMerger::new(&base, &overlay).merge();
        assert_eq!(strategy_of(result), "index.orphan_doc_part_index");
        assert!(base
            .database_by_name("d")
            .unwrap()
            .collection_by_name("c")
            .unwrap()
            .index_by_name("a_1")
            .is_some());
        assert!(overlay.has_changes());
    }
}
