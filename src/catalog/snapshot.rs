//! catalog::snapshot
//!
//! The immutable schema tree: snapshot, databases, collections.
//!
//! # Architecture
//!
//! A [`Snapshot`] is one complete version of the catalog. Once wrapped in an
//! `Arc` and published it is never modified: new versions are produced by a
//! [`SnapshotBuilder`](super::builder::SnapshotBuilder) that starts from a
//! clone, which shares every untouched subtree with the original.
//!
//! # Invariants
//!
//! - Names and identifiers are unique among siblings at every level
//! - Equality is structural: equal snapshots describe the same catalog

use super::doc_part::{DocPart, DocPartIndex};
use super::entry::{CatalogEntry, EntryClash, EntryMap};
use super::error::{CatalogError, ElementKind, ElementPath};
use super::index::Index;
use crate::core::types::TableRef;

/// One complete, immutable version of the schema catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    databases: EntryMap<Database>,
}

impl Snapshot {
    /// The empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a database by name.
    pub fn database_by_name(&self, name: &str) -> Option<&Database> {
        self.databases.get_by_key(name)
    }

    /// Look up a database by identifier.
    pub fn database_by_identifier(&self, identifier: &str) -> Option<&Database> {
        self.databases.get(identifier)
    }

    /// Databases in identifier order.
    pub fn databases(&self) -> impl Iterator<Item = &Database> {
        self.databases.iter()
    }

    /// Number of databases.
    pub fn database_count(&self) -> usize {
        self.databases.len()
    }

    /// Whether the catalog has no databases.
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Whether both snapshots share every database by pointer.
    ///
    /// True for a snapshot and an unmodified clone of it.
    pub fn shares_structure_with(&self, other: &Snapshot) -> bool {
        self.databases.ptr_eq(&other.databases)
    }

    pub(crate) fn databases_mut(&mut self) -> &mut EntryMap<Database> {
        &mut self.databases
    }
}

/// A database: a named group of collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    name: String,
    identifier: String,
    collections: EntryMap<Collection>,
}

impl Database {
    /// Create an empty database.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            collections: EntryMap::new(),
        }
    }

    /// The user-facing name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The physical schema name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Look up a collection by name.
    pub fn collection_by_name(&self, name: &str) -> Option<&Collection> {
        self.collections.get_by_key(name)
    }

    /// Look up a collection by identifier.
    pub fn collection_by_identifier(&self, identifier: &str) -> Option<&Collection> {
        self.collections.get(identifier)
    }

    /// Collections in identifier order.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    /// Add a collection.
    pub fn insert_collection(&mut self, collection: Collection) -> Result<&mut Collection, CatalogError> {
        let (name, identifier) = (
            collection.name().to_string(),
            collection.identifier().to_string(),
        );
        let parent = ElementPath::root().child(&self.name);
        self.collections
            .insert(collection)
            .map_err(|clash| clash_error(clash, ElementKind::Collection, name, identifier, parent))
    }

    /// Mutable access to a collection.
    pub fn collection_mut(&mut self, identifier: &str) -> Option<&mut Collection> {
        self.collections.get_mut(identifier)
    }

    /// Remove a collection by identifier.
    pub fn remove_collection(&mut self, identifier: &str) -> Option<Collection> {
        self.collections
            .remove(identifier)
            .map(super::doc_part::unwrap_or_clone)
    }

    /// Whether both databases share every collection by pointer.
    pub fn shares_structure_with(&self, other: &Database) -> bool {
        self.collections.ptr_eq(&other.collections)
    }
}

impl CatalogEntry for Database {
    type Key = String;

    fn key(&self) -> &String {
        &self.name
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// A collection: doc parts holding its documents plus its logical indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    name: String,
    identifier: String,
    doc_parts: EntryMap<DocPart>,
    indexes: EntryMap<Index>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            doc_parts: EntryMap::new(),
            indexes: EntryMap::new(),
        }
    }

    /// The user-facing name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier prefix of this collection's tables.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Look up a doc part by table ref.
    pub fn doc_part_by_table_ref(&self, table_ref: &TableRef) -> Option<&DocPart> {
        self.doc_parts.get_by_key(table_ref)
    }

    /// Look up a doc part by identifier.
    pub fn doc_part_by_identifier(&self, identifier: &str) -> Option<&DocPart> {
        self.doc_parts.get(identifier)
    }

    /// Doc parts in table ref order, parents before children.
    pub fn doc_parts(&self) -> impl Iterator<Item = &DocPart> {
        self.doc_parts.iter_by_key()
    }

    /// Look up a logical index by name.
    pub fn index_by_name(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Logical indexes in name order.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    /// Logical indexes compatible with `dpi` on `doc_part`.
    pub fn anchoring_indexes<'a>(
        &'a self,
        doc_part: &'a DocPart,
        dpi: &'a DocPartIndex,
    ) -> impl Iterator<Item = &'a Index> + 'a {
        self.indexes()
            .filter(move |index| index.is_compatible(doc_part, dpi))
    }

    /// Doc parts on which `index` requires a physical index but has none.
    pub fn unsatisfied_doc_parts<'a>(&'a self, index: &'a Index) -> impl Iterator<Item = &'a DocPart> + 'a {
        index
            .table_refs()
            .into_iter()
            .filter_map(move |tr| self.doc_part_by_table_ref(tr))
            .filter(move |dp| !index.is_satisfied_by(dp))
    }

    /// Add a doc part.
    ///
    /// A nested doc part can only be added once its parent exists.
    pub fn insert_doc_part(&mut self, doc_part: DocPart) -> Result<&mut DocPart, CatalogError> {
        let parent = ElementPath::root().child(&self.name);
        if let Some(enclosing) = doc_part.table_ref().parent() {
            if self.doc_part_by_table_ref(&enclosing).is_none() {
                return Err(CatalogError::MissingParentDocPart {
                    table_ref: doc_part.table_ref().clone(),
                    parent,
                });
            }
        }
        let (key, identifier) = (
            doc_part.table_ref().to_string(),
            doc_part.identifier().to_string(),
        );
        self.doc_parts
            .insert(doc_part)
            .map_err(|clash| clash_error(clash, ElementKind::DocPart, key, identifier, parent))
    }

    /// Mutable access to a doc part.
    pub fn doc_part_mut(&mut self, identifier: &str) -> Option<&mut DocPart> {
        self.doc_parts.get_mut(identifier)
    }

    /// Remove a doc part by identifier.
    pub fn remove_doc_part(&mut self, identifier: &str) -> Option<DocPart> {
        self.doc_parts
            .remove(identifier)
            .map(super::doc_part::unwrap_or_clone)
    }

    /// Whether some other doc part is nested directly under `table_ref`.
    pub fn has_child_doc_parts(&self, table_ref: &TableRef) -> bool {
        self.doc_parts()
            .any(|dp| dp.table_ref().parent().as_ref() == Some(table_ref))
    }

    /// Add a logical index.
    pub fn insert_index(&mut self, index: Index) -> Result<&mut Index, CatalogError> {
        let name = index.name().to_string();
        let parent = ElementPath::root().child(&self.name);
        self.indexes
            .insert(index)
            .map_err(|clash| clash_error(clash, ElementKind::Index, name.clone(), name, parent))
    }

    /// Insert or overwrite a logical index.
    pub(crate) fn replace_index(&mut self, index: Index) -> Result<(), CatalogError> {
        let name = index.name().to_string();
        let parent = ElementPath::root().child(&self.name);
        self.indexes
            .replace(index)
            .map_err(|clash| clash_error(clash, ElementKind::Index, name.clone(), name, parent))
    }

    /// Mutable access to a logical index.
    pub fn index_mut(&mut self, name: &str) -> Option<&mut Index> {
        self.indexes.get_mut(name)
    }

    /// Remove a logical index by name.
    pub fn remove_index(&mut self, name: &str) -> Option<Index> {
        self.indexes
            .remove(name)
            .map(super::doc_part::unwrap_or_clone)
    }
}

impl CatalogEntry for Collection {
    type Key = String;

    fn key(&self) -> &String {
        &self.name
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Map an [`EntryClash`] to the matching duplicate error.
pub(crate) fn clash_error(
    clash: EntryClash,
    kind: ElementKind,
    key: String,
    identifier: String,
    parent: ElementPath,
) -> CatalogError {
    match clash {
        EntryClash::Key => CatalogError::DuplicateName { kind, key, parent },
        EntryClash::Identifier => CatalogError::DuplicateIdentifier {
            kind,
            identifier,
            parent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::doc_part::Field;
    use crate::core::types::{FieldIndexOrdering, FieldType};

    #[test]
    fn collection_lookups() {
        let mut db = Database::new("d", "d_id");
        let col = db.insert_collection(Collection::new("c", "c_id")).unwrap();
        col.insert_doc_part(DocPart::new(TableRef::root(), "c_root"))
            .unwrap();

        assert_eq!(db.collection_by_name("c").unwrap().identifier(), "c_id");
        let col = db.collection_by_identifier("c_id").unwrap();
        assert_eq!(
            col.doc_part_by_table_ref(&TableRef::root())
                .unwrap()
                .identifier(),
            "c_root"
        );
        assert!(col.doc_part_by_identifier("c_root").is_some());
    }

    #[test]
    fn nested_doc_part_needs_parent() {
        let mut col = Collection::new("c", "c_id");
        let nested = TableRef::root().child_object("a");
        let err = col
            .insert_doc_part(DocPart::new(nested.clone(), "c_a"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingParentDocPart { .. }));

        col.insert_doc_part(DocPart::new(TableRef::root(), "c_root"))
            .unwrap();
        col.insert_doc_part(DocPart::new(nested, "c_a")).unwrap();
        assert!(col.has_child_doc_parts(&TableRef::root()));
    }

    #[test]
    fn unsatisfied_doc_parts_reports_missing_physical_index() {
        let mut col = Collection::new("c", "c_id");
        let dp = col
            .insert_doc_part(DocPart::new(TableRef::root(), "c_root"))
            .unwrap();
        dp.insert_field(Field::new("a", "a_i", FieldType::Integer))
            .unwrap();

        let mut idx = Index::new("a_1", false);
        idx.push_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
            .unwrap();
        let idx = col.insert_index(idx).unwrap().clone();

        let missing: Vec<_> = col
            .unsatisfied_doc_parts(&idx)
            .map(DocPart::identifier)
            .collect();
        assert_eq!(missing, vec!["c_root"]);
    }

    #[test]
    fn replace_index_overwrites_definition() {
        let mut col = Collection::new("c", "c_id");
        col.insert_index(Index::new("a_1", false)).unwrap();

        let mut wider = Index::new("a_1", false);
        wider
            .push_field(TableRef::root(), "a", FieldIndexOrdering::Asc)
            .unwrap();
        col.replace_index(wider).unwrap();
        assert_eq!(col.index_by_name("a_1").unwrap().fields().len(), 1);

        col.replace_index(Index::new("b_1", true)).unwrap();
        assert_eq!(col.indexes().count(), 2);
    }

    #[test]
    fn clone_shares_structure_until_mutated() {
        let mut snapshot = Snapshot::empty();
        snapshot
            .databases_mut()
            .insert(Database::new("d", "d_id"))
            .unwrap();

        let mut copy = snapshot.clone();
        assert!(copy.shares_structure_with(&snapshot));
        assert_eq!(copy, snapshot);

        copy.databases_mut()
            .get_mut("d_id")
            .unwrap()
            .insert_collection(Collection::new("c", "c_id"))
            .unwrap();
        assert!(!copy.shares_structure_with(&snapshot));
        assert!(snapshot
            .database_by_identifier("d_id")
            .unwrap()
            .collection_by_name("c")
            .is_none());
    }
}
