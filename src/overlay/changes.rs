//! overlay::changes
//!
//! Change tags recorded by an overlay, mirroring the catalog containment.
//!
//! # Bookkeeping
//!
//! - Adding an element records [`ChangeTag::Added`]
//! - Taking a mutable handle on an existing element records
//!   [`ChangeTag::Modified`], unless the element is already tagged
//! - Removing an element added by the same overlay erases its record;
//!   removing a base element records [`ChangeTag::Removed`] and drops any
//!   records beneath it
//!
//! Records are keyed by identifier, except logical indexes whose name is
//! their identifier.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::error::{CatalogError, ElementKind};

/// How an element differs from the overlay's base snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeTag {
    Added,
    Modified,
    Removed,
}

impl ChangeTag {
    /// Whether the tag belongs on the add/modify path of the merger.
    pub fn is_upsert(self) -> bool {
        !matches!(self, ChangeTag::Removed)
    }
}

impl fmt::Display for ChangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeTag::Added => "added",
            ChangeTag::Modified => "modified",
            ChangeTag::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// A tagged record, possibly with nested records.
pub trait ChangeRecord {
    /// Create a record with no nested changes.
    fn tagged(tag: ChangeTag) -> Self;

    /// The element's tag.
    fn tag(&self) -> ChangeTag;

    /// Whether the record carries no effective change.
    fn is_noop(&self) -> bool;

    /// Number of effective tagged records, this one included.
    fn count(&self) -> usize;
}

impl ChangeRecord for ChangeTag {
    fn tagged(tag: ChangeTag) -> Self {
        tag
    }

    fn tag(&self) -> ChangeTag {
        *self
    }

    fn is_noop(&self) -> bool {
        false
    }

    fn count(&self) -> usize {
        1
    }
}

/// Sibling records keyed by identifier.
pub type Records<R> = BTreeMap<String, R>;

/// Lookup of sibling removals, used by merge strategies to ignore committed
/// elements the overlay has dropped.
pub trait SiblingChanges {
    /// Whether the overlay removed the sibling with this identifier.
    fn was_removed(&self, identifier: &str) -> bool;
}

impl<R: ChangeRecord> SiblingChanges for Records<R> {
    fn was_removed(&self, identifier: &str) -> bool {
        self.get(identifier)
            .is_some_and(|r| r.tag() == ChangeTag::Removed)
    }
}

/// Changes to the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub databases: Records<DatabaseChanges>,
}

impl ChangeSet {
    /// Whether nothing effective was changed.
    pub fn is_empty(&self) -> bool {
        self.databases.values().all(ChangeRecord::is_noop)
    }

    /// Number of effective tagged records.
    pub fn count(&self) -> usize {
        count_all(&self.databases)
    }
}

/// Changes to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseChanges {
    pub tag: ChangeTag,
    pub collections: Records<CollectionChanges>,
}

/// Changes to one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChanges {
    pub tag: ChangeTag,
    pub doc_parts: Records<DocPartChanges>,
    pub indexes: Records<ChangeTag>,
}

/// Changes to one doc part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPartChanges {
    pub tag: ChangeTag,
    pub fields: Records<ChangeTag>,
    pub scalars: Records<ChangeTag>,
    pub indexes: Records<ChangeTag>,
}

impl ChangeRecord for DatabaseChanges {
    fn tagged(tag: ChangeTag) -> Self {
        Self {
            tag,
            collections: Records::new(),
        }
    }

    fn tag(&self) -> ChangeTag {
        self.tag
    }

    fn is_noop(&self) -> bool {
        self.tag == ChangeTag::Modified && self.collections.values().all(ChangeRecord::is_noop)
    }

    fn count(&self) -> usize {
        own_count(self) + count_all(&self.collections)
    }
}

impl ChangeRecord for CollectionChanges {
    fn tagged(tag: ChangeTag) -> Self {
        Self {
            tag,
            doc_parts: Records::new(),
            indexes: Records::new(),
        }
    }

    fn tag(&self) -> ChangeTag {
        self.tag
    }

    fn is_noop(&self) -> bool {
        self.tag == ChangeTag::Modified
            && self.indexes.is_empty()
            && self.doc_parts.values().all(ChangeRecord::is_noop)
    }

    fn count(&self) -> usize {
        own_count(self) + count_all(&self.doc_parts) + self.indexes.len()
    }
}

impl ChangeRecord for DocPartChanges {
    fn tagged(tag: ChangeTag) -> Self {
        Self {
            tag,
            fields: Records::new(),
            scalars: Records::new(),
            indexes: Records::new(),
        }
    }

    fn tag(&self) -> ChangeTag {
        self.tag
    }

    fn is_noop(&self) -> bool {
        self.tag == ChangeTag::Modified
            && self.fields.is_empty()
            && self.scalars.is_empty()
            && self.indexes.is_empty()
    }

    fn count(&self) -> usize {
        own_count(self) + self.fields.len() + self.scalars.len() + self.indexes.len()
    }
}

fn own_count<R: ChangeRecord>(record: &R) -> usize {
    usize::from(!record.is_noop())
}

fn count_all<R: ChangeRecord>(records: &Records<R>) -> usize {
    records.values().map(ChangeRecord::count).sum()
}

/// Refuse to add back an element this overlay removed.
pub(crate) fn ensure_not_removed<R: ChangeRecord>(
    records: &Records<R>,
    identifier: &str,
    kind: ElementKind,
    key: impl fmt::Display,
) -> Result<(), CatalogError> {
    if records.was_removed(identifier) {
        return Err(CatalogError::RemovedInOverlay {
            kind,
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Record an addition.
pub(crate) fn mark_added<'a, R: ChangeRecord>(records: &'a mut Records<R>, identifier: &str) -> &'a mut R {
    let slot = records
        .entry(identifier.to_string())
        .or_insert_with(|| R::tagged(ChangeTag::Added));
    *slot = R::tagged(ChangeTag::Added);
    slot
}

/// Record a modification, keeping an existing tag.
pub(crate) fn mark_modified<'a, R: ChangeRecord>(records: &'a mut Records<R>, identifier: &str) -> &'a mut R {
    records
        .entry(identifier.to_string())
        .or_insert_with(|| R::tagged(ChangeTag::Modified))
}

/// Record a removal.
pub(crate) fn mark_removed<R: ChangeRecord>(records: &mut Records<R>, identifier: &str) {
    if records
        .get(identifier)
        .is_some_and(|r| r.tag() == ChangeTag::Added)
    {
        records.remove(identifier);
    } else {
        records.insert(identifier.to_string(), R::tagged(ChangeTag::Removed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_an_addition_erases_it() {
        let mut records: Records<ChangeTag> = Records::new();
        mark_added(&mut records, "a");
        mark_removed(&mut records, "a");
        assert!(records.is_empty());

        mark_removed(&mut records, "b");
        assert_eq!(records.get("b"), Some(&ChangeTag::Removed));
        assert!(records.was_removed("b"));
    }

    #[test]
    fn modification_keeps_addition() {
        let mut records: Records<DatabaseChanges> = Records::new();
        mark_added(&mut records, "d");
        assert_eq!(mark_modified(&mut records, "d").tag, ChangeTag::Added);
        assert_eq!(mark_modified(&mut records, "e").tag, ChangeTag::Modified);
    }

    #[test]
    fn removal_drops_nested_records() {
        let mut records: Records<DatabaseChanges> = Records::new();
        mark_modified(&mut records, "d")
            .collections
            .insert("c".into(), CollectionChanges::tagged(ChangeTag::Added));
        mark_removed(&mut records, "d");
        assert!(records["d"].collections.is_empty());
    }

    #[test]
    fn re_adding_removed_element_is_refused() {
        let mut records: Records<ChangeTag> = Records::new();
        mark_removed(&mut records, "x");
        let err = ensure_not_removed(&records, "x", ElementKind::Field, "x").unwrap_err();
        assert!(matches!(err, CatalogError::RemovedInOverlay { .. }));
        assert!(ensure_not_removed(&records, "y", ElementKind::Field, "y").is_ok());
    }

    #[test]
    fn empty_modifications_are_noops() {
        let mut set = ChangeSet::default();
        let db = mark_modified(&mut set.databases, "d");
        mark_modified(&mut db.collections, "c");
        assert!(set.is_empty());
        assert_eq!(set.count(), 0);

        let col = mark_modified(&mut set.databases, "d");
        let col = mark_modified(&mut col.collections, "c");
        mark_added(&mut col.indexes, "i");
        assert!(!set.is_empty());
        // database, collection and index
        assert_eq!(set.count(), 3);
    }
}
