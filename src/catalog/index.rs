//! catalog::index
//!
//! Logical indexes and their coupling with physical doc part indexes.
//!
//! # Coupling
//!
//! A logical index is declared on document paths; the same path may be
//! stored in several doc parts. Each doc part that carries the indexed
//! fields needs its own physical index:
//!
//! - The **projection** of an index onto a table ref is the ordered list of
//!   its fields living in that table ref.
//! - A doc part index is **compatible** with a logical index when it has the
//!   same uniqueness and its columns, mapped back to field names, spell the
//!   projection exactly (same order, same directions).
//! - An index **requires** a physical index on a doc part when the
//!   projection is non-empty and the doc part has a field for every
//!   projected name.
//!
//! A snapshot is coupled when every requirement is met by a compatible doc
//! part index and every doc part index is compatible with some logical
//! index.

use std::collections::BTreeSet;
use std::fmt;

use super::doc_part::{DocPart, DocPartIndex};
use super::entry::CatalogEntry;
use super::error::{CatalogError, ElementKind, ElementPath};
use crate::core::types::{FieldIndexOrdering, TableRef};

/// One (path, direction) entry of a logical index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexField {
    /// Doc part holding the field.
    pub table_ref: TableRef,
    /// Field name within that doc part.
    pub name: String,
    /// Sort direction.
    pub ordering: FieldIndexOrdering,
}

impl fmt::Display for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.table_ref, self.name, self.ordering)
    }
}

/// A user-visible index definition.
///
/// The name doubles as the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    unique: bool,
    fields: Vec<IndexField>,
}

impl Index {
    /// Create an index without fields.
    pub fn new(name: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            fields: Vec::new(),
        }
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the index enforces uniqueness.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Fields in index order.
    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    /// Field at `position`.
    pub fn field(&self, position: usize) -> Option<&IndexField> {
        self.fields.get(position)
    }

    /// Append a field.
    ///
    /// A (table ref, name) pair may appear only once per index.
    pub fn push_field(
        &mut self,
        table_ref: TableRef,
        name: impl Into<String>,
        ordering: FieldIndexOrdering,
    ) -> Result<(), CatalogError> {
        let name = name.into();
        if self
            .fields
            .iter()
            .any(|f| f.table_ref == table_ref && f.name == name)
        {
            return Err(CatalogError::DuplicateName {
                kind: ElementKind::IndexField,
                key: format!("{table_ref}/{name}"),
                parent: ElementPath::root().child(&self.name),
            });
        }
        self.fields.push(IndexField {
            table_ref,
            name,
            ordering,
        });
        Ok(())
    }

    /// Remove the field `name` of `table_ref`.
    pub fn remove_field(&mut self, table_ref: &TableRef, name: &str) -> Option<IndexField> {
        let position = self
            .fields
            .iter()
            .position(|f| &f.table_ref == table_ref && f.name == name)?;
        Some(self.fields.remove(position))
    }

    /// Move the field at `from` to position `to`, shifting the ones between.
    pub fn move_field(&mut self, from: usize, to: usize) -> Result<(), CatalogError> {
        let len = self.fields.len();
        if let Some(bad) = [from, to].into_iter().find(|&p| p >= len) {
            return Err(CatalogError::NotFound {
                kind: ElementKind::IndexField,
                key: bad.to_string(),
                parent: ElementPath::root().child(&self.name),
            });
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        Ok(())
    }

    /// Distinct table refs touched by the index.
    pub fn table_refs(&self) -> BTreeSet<&TableRef> {
        self.fields.iter().map(|f| &f.table_ref).collect()
    }

    /// Fields living in `table_ref`, in index order.
    pub fn projection<'a>(&'a self, table_ref: &'a TableRef) -> impl Iterator<Item = &'a IndexField> + 'a {
        self.fields.iter().filter(move |f| &f.table_ref == table_ref)
    }

    /// Whether both indexes describe the same definition under any name.
    pub fn same_definition(&self, other: &Index) -> bool {
        self.unique == other.unique && self.fields == other.fields
    }

    /// Whether `index` on `doc_part` is a physical realisation of this index.
    pub fn is_compatible(&self, doc_part: &DocPart, index: &DocPartIndex) -> bool {
        if index.is_unique() != self.unique {
            return false;
        }
        let projection: Vec<_> = self.projection(doc_part.table_ref()).collect();
        if projection.is_empty() || projection.len() != index.columns().len() {
            return false;
        }
        projection
            .iter()
            .zip(index.columns())
            .all(|(field, column)| {
                field.ordering == column.ordering
                    && doc_part
                        .field_by_identifier(&column.identifier)
                        .is_some_and(|f| f.name() == field.name)
            })
    }

    /// Whether this index needs a physical index on `doc_part`.
    pub fn requires_doc_part_index(&self, doc_part: &DocPart) -> bool {
        let mut projection = self.projection(doc_part.table_ref()).peekable();
        projection.peek().is_some() && projection.all(|f| doc_part.has_field_named(&f.name))
    }

    /// Whether `doc_part` satisfies this index's requirement on it.
    pub fn is_satisfied_by(&self, doc_part: &DocPart) -> bool {
        !self.requires_doc_part_index(doc_part)
            || doc_part
                .doc_part_indexes()
                .any(|dpi| self.is_compatible(doc_part, dpi))
    }
}

impl CatalogEntry for Index {
    type Key = String;

    fn key(&self) -> &String {
        &self.name
    }

    fn identifier(&self) -> &str {
        &self.name
    }
}
