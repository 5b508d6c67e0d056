//! merge::coupling
//!
//! Coupling checks on a collection after the merger folded it.
//!
//! Strategies judge each change against the overlay's own view. Two overlays
//! that are each coupled on their own can still combine into a collection
//! that is not: one adds a logical index over a field, the other adds the
//! field; one adds a physical index on a column, the other drops the field.
//! Once every change of a collection is in the builder, the folded
//! collection is checked as a whole and the first broken rule rejects the
//! merge under the strategy that owns that rule.
//!
//! The committed collection is coupled, so anything reported here was
//! introduced by the merge.

use crate::catalog::doc_part::DocPart;
use crate::catalog::error::ElementPath;
use crate::catalog::snapshot::Collection;
use crate::catalog::verify::{verify_collection, VerifyError};
use crate::core::types::TableRef;
use crate::overlay::{ChangeTag, CollectionChanges};

use super::conflict::{ConflictReason, MergeConflict};
use super::strategies::{
    DocPartIndexMergeStrategy, DocPartIndexRemoveStrategy, DocPartRemoveStrategy, FieldRemoveStrategy,
    IndexMergeStrategy, IndexRemoveStrategy,
};
use super::strategy::MergeStrategy;

/// Reject the merge if `folded` breaks a coupling rule.
///
/// `base` is the collection as the overlay first saw it and `record` what
/// the overlay changed in it.
pub(crate) fn check_collection(
    base: Option<&Collection>,
    record: &CollectionChanges,
    folded: &Collection,
    path: &ElementPath,
) -> Result<(), MergeConflict> {
    match verify_collection(folded, path).into_iter().next() {
        None => Ok(()),
        Some(violation) => Err(conflict_for(base, record, folded, path, violation)),
    }
}

fn conflict_for(
    base: Option<&Collection>,
    record: &CollectionChanges,
    folded: &Collection,
    path: &ElementPath,
    violation: VerifyError,
) -> MergeConflict {
    match violation {
        VerifyError::OrphanDocPart { table_ref, .. } => MergeConflict::new(
            DocPartRemoveStrategy::HasChildren.id(),
            path,
            ConflictReason::DocPartHasChildren {
                table_ref: table_ref.parent().unwrap_or_else(TableRef::root),
                child: table_ref.to_string(),
            },
        ),

        VerifyError::DanglingColumn {
            table_ref,
            index,
            column,
            ..
        } => {
            let field = base
                .and_then(|c| c.doc_part_by_table_ref(&table_ref))
                .and_then(|dp| dp.field_by_identifier(&column))
                .map(ToString::to_string)
                .unwrap_or(column);
            MergeConflict::new(
                FieldRemoveStrategy::InUse.id(),
                &path.child(&table_ref),
                ConflictReason::FieldInUse {
                    field,
                    doc_part_index: index,
                },
            )
        }

        VerifyError::UnanchoredDocPartIndex { table_ref, index, .. } => {
            let doc_part = identifier_of(folded, &table_ref);
            match removed_anchor(base, record, folded, &table_ref, &index) {
                Some(removed) => MergeConflict::new(
                    IndexRemoveStrategy::OrphanDocPartIndex.id(),
                    path,
                    ConflictReason::OrphanDocPartIndex {
                        index: removed,
                        doc_part_index: index,
                        doc_part,
                    },
                ),
                None => MergeConflict::new(
                    DocPartIndexMergeStrategy::Unanchored.id(),
                    &path.child(&table_ref),
                    ConflictReason::UnanchoredDocPartIndex {
                        doc_part_index: index,
                        doc_part,
                    },
                ),
            }
        }

        VerifyError::MissingDocPartIndex { index, table_ref, .. } => {
            let doc_part = identifier_of(folded, &table_ref);
            match removed_doc_part_index(record, &doc_part) {
                Some(removed) => MergeConflict::new(
                    DocPartIndexRemoveStrategy::StillRequired.id(),
                    &path.child(&table_ref),
                    ConflictReason::DocPartIndexStillRequired {
                        doc_part_index: removed,
                        index,
                        doc_part,
                    },
                ),
                None => MergeConflict::new(
                    IndexMergeStrategy::MissingDocPartIndex.id(),
                    path,
                    ConflictReason::MissingDocPartIndex {
                        index,
                        table_ref,
                        doc_part,
                    },
                ),
            }
        }
    }
}

fn identifier_of(collection: &Collection, table_ref: &TableRef) -> String {
    collection
        .doc_part_by_table_ref(table_ref)
        .map(|dp| dp.identifier().to_string())
        .unwrap_or_default()
}

/// An index the overlay removed that used to anchor `dpi_identifier`.
fn removed_anchor(
    base: Option<&Collection>,
    record: &CollectionChanges,
    folded: &Collection,
    table_ref: &TableRef,
    dpi_identifier: &str,
) -> Option<String> {
    let base = base?;
    let doc_part: &DocPart = folded.doc_part_by_table_ref(table_ref)?;
    let dpi = doc_part.doc_part_index_by_identifier(dpi_identifier)?;
    record
        .indexes
        .iter()
        .filter(|(_, tag)| **tag == ChangeTag::Removed)
        .filter_map(|(name, _)| base.index_by_name(name))
        .find(|index| index.is_compatible(doc_part, dpi))
        .map(|index| index.name().to_string())
}

/// A doc part index the overlay removed from the doc part `identifier`.
fn removed_doc_part_index(record: &CollectionChanges, identifier: &str) -> Option<String> {
    record
        .doc_parts
        .get(identifier)?
        .indexes
        .iter()
        .find(|(_, tag)| **tag == ChangeTag::Removed)
        .map(|(id, _)| id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::doc_part::{DocPartIndex, Field};
    use crate::catalog::index::Index;
    use crate::core::types::{FieldIndexOrdering, FieldType};
    use crate::overlay::ChangeRecord;

    fn collection(with_field: bool, with_dpi: bool, with_index: bool) -> Collection {
        let mut col = Collection::new("c", "c_id");
        let dp = col
            .insert_doc_part(DocPart::new(TableRef::root(), "c_root"))
            .unwrap();
        if with_field {
            dp.insert_field(Field::new("a", "a_i", FieldType::Integer))
                .unwrap();
        }
        if with_dpi {
            dp.insert_doc_part_index(DocPartIndex::with_columns(
                "c_root_a",
                false,
                [("a_i".to_string(), FieldIndexOrdering::Asc)],
            ))
            .unwrap();
        }
        if with_index {
            let mut idx = Index::new("a_1", false);
            idx.push_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
                .unwrap();
            col.insert_index(idx).unwrap();
        }
        col
    }

    fn path() -> ElementPath {
        ElementPath::root().child("d").child("c")
    }

    fn strategy(result: Result<(), MergeConflict>) -> &'static str {
        result.unwrap_err().strategy().as_str()
    }

    #[test]
    fn coupled_collection_passes() {
        let record = CollectionChanges::tagged(ChangeTag::Modified);
        let folded = collection(true, true, true);
        assert!(check_collection(None, &record, &folded, &path()).is_ok());
    }

    #[test]
    fn field_dropped_under_a_column_is_in_use() {
        let record = CollectionChanges::tagged(ChangeTag::Modified);
        let folded = collection(false, true, true);
        assert_eq!(
            strategy(check_collection(None, &record, &folded, &path())),
            "field.in_use"
        );
    }

    #[test]
    fn new_requirement_is_a_missing_doc_part_index() {
        let record = CollectionChanges::tagged(ChangeTag::Modified);
        let folded = collection(true, false, true);
        assert_eq!(
            strategy(check_collection(None, &record, &folded, &path())),
            "index.missing_doc_part_index"
        );
    }

    #[test]
    fn removed_physical_index_is_still_required() {
        let mut record = CollectionChanges::tagged(ChangeTag::Modified);
        let mut dp_record = crate::overlay::DocPartChanges::tagged(ChangeTag::Modified);
        dp_record
            .indexes
            .insert("c_root_a".into(), ChangeTag::Removed);
        record.doc_parts.insert("c_root".into(), dp_record);

        let folded = collection(true, false, true);
        let conflict = check_collection(None, &record, &folded, &path()).unwrap_err();
        assert_eq!(conflict.strategy().as_str(), "doc_part_index.still_required");
        assert!(conflict.to_string().contains("c_root_a"));
    }

    #[test]
    fn removed_anchor_is_an_orphan() {
        let base = collection(true, true, true);
        let mut record = CollectionChanges::tagged(ChangeTag::Modified);
        record.indexes.insert("a_1".into(), ChangeTag::Removed);

        let folded = collection(true, true, false);
        let conflict = check_collection(Some(&base), &record, &folded, &path()).unwrap_err();
        assert_eq!(conflict.strategy().as_str(), "index.orphan_doc_part_index");
        assert!(conflict.to_string().contains("a_1"));
    }

    #[test]
    fn unanchored_without_removal() {
        let record = CollectionChanges::tagged(ChangeTag::Modified);
        let folded = collection(true, true, false);
        assert_eq!(
            strategy(check_collection(None, &record, &folded, &path())),
            "doc_part_index.unanchored"
        );
    }
}
