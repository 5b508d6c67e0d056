//! Property-based tests for the catalog.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use docpart_catalog::catalog::Snapshot;
use docpart_catalog::core::types::{FieldType, TableRef};
use docpart_catalog::engine::Repository;
use docpart_catalog::merge::SnapshotMerger;
use docpart_catalog::overlay::SnapshotOverlay;

/// Strategy for generating element names.
fn element_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

/// Strategy for generating nested table refs.
fn table_ref() -> impl Strategy<Value = TableRef> {
    prop::collection::vec(
        prop_oneof![
            element_name().prop_map(Step::Object),
            (1u32..4).prop_map(Step::Array),
        ],
        0..5,
    )
    .prop_map(|steps| {
        steps.into_iter().fold(TableRef::root(), |tr, step| match step {
            Step::Object(key) => tr.child_object(key),
            Step::Array(dimension) => tr.child_array(dimension),
        })
    })
}

#[derive(Debug, Clone)]
enum Step {
    Object(String),
    Array(u32),
}

/// Strategy for a set of (field name, type) pairs.
fn fields() -> impl Strategy<Value = Vec<(String, FieldType)>> {
    prop::collection::btree_set(
        (element_name(), prop::sample::select(FieldType::ALL.to_vec())),
        0..12,
    )
    .prop_map(|set| set.into_iter().collect())
}

/// One database with one root doc part holding `fields`, added in order.
fn overlay_with_fields(base: &Arc<Snapshot>, fields: &[(String, FieldType)]) -> SnapshotOverlay {
    let mut overlay = SnapshotOverlay::new(Arc::clone(base), 0);
    {
        let mut db = overlay.add_database("d", "d_id").unwrap();
        let mut col = db.add_collection("c", "c_id").unwrap();
        let mut dp = col.add_doc_part(TableRef::root(), "c_root").unwrap();
        for (name, field_type) in fields {
            dp.add_field(name.clone(), format!("{name}_{}", field_type.as_str()), *field_type)
                .unwrap();
        }
    }
    overlay
}

proptest! {
    /// Any table ref prints and parses back to itself.
    #[test]
    fn table_ref_text_roundtrip(tr in table_ref()) {
        let parsed = TableRef::parse(&tr.to_string()).unwrap();
        prop_assert_eq!(parsed, tr);
    }

    /// Children sort after their parent and point back to it.
    #[test]
    fn table_ref_children_follow_parent(tr in table_ref(), key in element_name(), dim in 1u32..4) {
        for child in [tr.child_object(key.clone()), tr.child_array(dim)] {
            prop_assert!(child > tr);
            prop_assert_eq!(child.depth(), tr.depth() + 1);
            prop_assert_eq!(child.parent(), Some(tr.clone()));
        }
    }

    /// Merging into an unchanged base yields exactly what the overlay shows.
    #[test]
    fn merge_onto_own_base_equals_overlay(names in prop::collection::btree_set(element_name(), 0..10)) {
        let base = Arc::new(Snapshot::empty());
        let mut overlay = SnapshotOverlay::new(Arc::clone(&base), 0);
        for name in &names {
            let mut db = overlay.add_database(name.clone(), format!("{name}_id")).unwrap();
            db.add_collection("c", format!("{name}_c")).unwrap();
        }

        let merged = SnapshotMerger::new(&base, &overlay).merge().unwrap();
        prop_assert_eq!(merged.database_count(), names.len());
        prop_assert_eq!(merged, overlay.materialize());
    }

    /// Fingerprints ignore the order elements were added in.
    #[test]
    fn fingerprint_ignores_insertion_order(fields in fields()) {
        let base = Arc::new(Snapshot::empty());
        let mut reversed = fields.clone();
        reversed.reverse();

        let forward = overlay_with_fields(&base, &fields).materialize();
        let backward = overlay_with_fields(&base, &reversed).materialize();

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.fingerprint().unwrap(), backward.fingerprint().unwrap());
    }

    /// Overlays touching disjoint databases merge to the same catalog in
    /// either order.
    #[test]
    fn disjoint_overlays_commute(
        left in prop::collection::btree_set(element_name(), 1..6),
        right in prop::collection::btree_set(element_name(), 1..6),
    ) {
        let right: BTreeSet<String> = right.difference(&left).cloned().collect();
        prop_assume!(!right.is_empty());

        let build = |first_left: bool| {
            let repository = Repository::new();
            let stage = repository.open_snapshot_stage();
            let mut a = stage.new_overlay();
            for name in &left {
                a.add_database(name.clone(), format!("{name}_id")).unwrap();
            }
            let mut b = stage.new_overlay();
            for name in &right {
                b.add_database(name.clone(), format!("{name}_id")).unwrap();
            }
            let (first, second) = if first_left { (a, b) } else { (b, a) };
            repository.merge(first).unwrap();
            repository.merge(second).unwrap()
        };

        let one = build(true);
        let other = build(false);
        prop_assert_eq!(one.database_count(), left.len() + right.len());
        prop_assert_eq!(&*one, &*other);
    }
}
