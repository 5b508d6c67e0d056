//! overlay::handles
//!
//! Mutable handles into an overlay's working copy.
//!
//! Each handle pairs an element of the working copy with its change record,
//! so every mutation is tagged as it happens. Handles dereference to the
//! element for reads.

use std::ops::Deref;

use super::changes::{ensure_not_removed, mark_added, mark_modified, mark_removed, ChangeTag, Records};
use super::changes::{CollectionChanges, DatabaseChanges, DocPartChanges};
use super::missing;
use crate::catalog::doc_part::{DocPart, DocPartIndex, DocPartIndexColumn, Field, Scalar};
use crate::catalog::error::{CatalogError, ElementKind, ElementPath};
use crate::catalog::index::Index;
use crate::catalog::snapshot::{Collection, Database};
use crate::core::types::{FieldIndexOrdering, FieldType, TableRef};

/// Mutable handle on a database of an overlay.
#[derive(Debug)]
pub struct DatabaseMut<'a> {
    database: &'a mut Database,
    changes: &'a mut DatabaseChanges,
}

impl<'a> DatabaseMut<'a> {
    pub(crate) fn new(database: &'a mut Database, changes: &'a mut DatabaseChanges) -> Self {
        Self { database, changes }
    }

    fn path(&self) -> ElementPath {
        ElementPath::root().child(self.database.name())
    }

    fn identifier_of(&self, name: &str) -> Result<String, CatalogError> {
        self.database
            .collection_by_name(name)
            .map(|c| c.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::Collection, name, self.path()))
    }

    /// Add an empty collection.
    pub fn add_collection(
        &mut self,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<CollectionMut<'_>, CatalogError> {
        let collection = Collection::new(name, identifier);
        let identifier = collection.identifier().to_string();
        ensure_not_removed(
            &self.changes.collections,
            &identifier,
            ElementKind::Collection,
            collection.name(),
        )?;
        let path = self.path().child(collection.name());
        let collection = self.database.insert_collection(collection)?;
        let changes = mark_added(&mut self.changes.collections, &identifier);
        Ok(CollectionMut {
            collection,
            changes,
            path,
        })
    }

    /// Mutable handle on an existing collection.
    pub fn collection_mut(&mut self, name: &str) -> Result<CollectionMut<'_>, CatalogError> {
        let identifier = self.identifier_of(name)?;
        let path = self.path().child(name);
        let collection = self
            .database
            .collection_mut(&identifier)
            .ok_or_else(|| missing(ElementKind::Collection, name, path.clone()))?;
        let changes = mark_modified(&mut self.changes.collections, &identifier);
        Ok(CollectionMut {
            collection,
            changes,
            path,
        })
    }

    /// Remove a collection and everything in it.
    pub fn remove_collection(&mut self, name: &str) -> Result<(), CatalogError> {
        let identifier = self.identifier_of(name)?;
        self.database.remove_collection(&identifier);
        mark_removed(&mut self.changes.collections, &identifier);
        Ok(())
    }
}

impl Deref for DatabaseMut<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        &*self.database
    }
}

/// Mutable handle on a collection of an overlay.
#[derive(Debug)]
pub struct CollectionMut<'a> {
    collection: &'a mut Collection,
    changes: &'a mut CollectionChanges,
    path: ElementPath,
}

impl CollectionMut<'_> {
    fn doc_part_identifier(&self, table_ref: &TableRef) -> Result<String, CatalogError> {
        self.collection
            .doc_part_by_table_ref(table_ref)
            .map(|dp| dp.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::DocPart, table_ref, self.path.clone()))
    }

    /// Add an empty doc part.
    ///
    /// A nested doc part needs its parent doc part first.
    pub fn add_doc_part(
        &mut self,
        table_ref: TableRef,
        identifier: impl Into<String>,
    ) -> Result<DocPartMut<'_>, CatalogError> {
        let doc_part = DocPart::new(table_ref, identifier);
        let identifier = doc_part.identifier().to_string();
        ensure_not_removed(
            &self.changes.doc_parts,
            &identifier,
            ElementKind::DocPart,
            doc_part.table_ref(),
        )?;
        let doc_part = self.collection.insert_doc_part(doc_part)?;
        let changes = mark_added(&mut self.changes.doc_parts, &identifier);
        Ok(DocPartMut { doc_part, changes })
    }

    /// Mutable handle on an existing doc part.
    pub fn doc_part_mut(&mut self, table_ref: &TableRef) -> Result<DocPartMut<'_>, CatalogError> {
        let identifier = self.doc_part_identifier(table_ref)?;
        let doc_part = self
            .collection
            .doc_part_mut(&identifier)
            .ok_or_else(|| missing(ElementKind::DocPart, table_ref, self.path.clone()))?;
        let changes = mark_modified(&mut self.changes.doc_parts, &identifier);
        Ok(DocPartMut { doc_part, changes })
    }

    /// Remove a doc part with no nested doc parts.
    pub fn remove_doc_part(&mut self, table_ref: &TableRef) -> Result<(), CatalogError> {
        let identifier = self.doc_part_identifier(table_ref)?;
        if self.collection.has_child_doc_parts(table_ref) {
            return Err(CatalogError::DocPartHasChildren {
                table_ref: table_ref.clone(),
                parent: self.path.clone(),
            });
        }
        self.collection.remove_doc_part(&identifier);
        mark_removed(&mut self.changes.doc_parts, &identifier);
        Ok(())
    }

    /// Add a logical index without fields.
    pub fn add_index(&mut self, name: impl Into<String>, unique: bool) -> Result<IndexMut<'_>, CatalogError> {
        let index = Index::new(name, unique);
        let name = index.name().to_string();
        ensure_not_removed(&self.changes.indexes, &name, ElementKind::Index, &name)?;
        let index = self.collection.insert_index(index)?;
        mark_added(&mut self.changes.indexes, &name);
        Ok(IndexMut {
            index,
            tags: &mut self.changes.indexes,
        })
    }

    /// Mutable handle on an existing logical index.
    ///
    /// The index is tagged modified once a field is added through the
    /// handle.
    pub fn index_mut(&mut self, name: &str) -> Result<IndexMut<'_>, CatalogError> {
        let index = self
            .collection
            .index_mut(name)
            .ok_or_else(|| missing(ElementKind::Index, name, self.path.clone()))?;
        Ok(IndexMut {
            index,
            tags: &mut self.changes.indexes,
        })
    }

    /// Remove a logical index.
    pub fn remove_index(&mut self, name: &str) -> Result<(), CatalogError> {
        if self.collection.remove_index(name).is_none() {
            return Err(missing(ElementKind::Index, name, self.path.clone()));
        }
        mark_removed(&mut self.changes.indexes, name);
        Ok(())
    }
}

impl Deref for CollectionMut<'_> {
    type Target = Collection;

    fn deref(&self) -> &Collection {
        &*self.collection
    }
}

/// Mutable handle on a logical index of an overlay.
#[derive(Debug)]
pub struct IndexMut<'a> {
    index: &'a mut Index,
    tags: &'a mut Records<ChangeTag>,
}

impl IndexMut<'_> {
    /// Append a field to the index.
    pub fn add_field(
        &mut self,
        table_ref: TableRef,
        name: impl Into<String>,
        ordering: FieldIndexOrdering,
    ) -> Result<&mut Self, CatalogError> {
        self.index.push_field(table_ref, name, ordering)?;
        mark_modified(self.tags, self.index.name());
        Ok(self)
    }

    /// Drop a field from the index.
    pub fn remove_field(&mut self, table_ref: &TableRef, name: &str) -> Result<&mut Self, CatalogError> {
        if self.index.remove_field(table_ref, name).is_none() {
            return Err(missing(
                ElementKind::IndexField,
                format!("{table_ref}/{name}"),
                ElementPath::root().child(self.index.name()),
            ));
        }
        mark_modified(self.tags, self.index.name());
        Ok(self)
    }

    /// Move the field at position `from` to `to`.
    pub fn move_field(&mut self, from: usize, to: usize) -> Result<&mut Self, CatalogError> {
        self.index.move_field(from, to)?;
        if from != to {
            mark_modified(self.tags, self.index.name());
        }
        Ok(self)
    }
}

impl Deref for IndexMut<'_> {
    type Target = Index;

    fn deref(&self) -> &Index {
        &*self.index
    }
}

/// Mutable handle on a doc part of an overlay.
#[derive(Debug)]
pub struct DocPartMut<'a> {
    doc_part: &'a mut DocPart,
    changes: &'a mut DocPartChanges,
}

impl DocPartMut<'_> {
    fn path(&self) -> ElementPath {
        ElementPath::root().child(self.doc_part.table_ref())
    }

    /// Add a typed field.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        identifier: impl Into<String>,
        field_type: FieldType,
    ) -> Result<&mut Self, CatalogError> {
        let field = Field::new(name, identifier, field_type);
        let identifier = field.identifier().to_string();
        ensure_not_removed(&self.changes.fields, &identifier, ElementKind::Field, &field)?;
        self.doc_part.insert_field(field)?;
        mark_added(&mut self.changes.fields, &identifier);
        Ok(self)
    }

    /// Remove the field storing `name` values of type `field_type`.
    pub fn remove_field(&mut self, name: &str, field_type: FieldType) -> Result<(), CatalogError> {
        let identifier = self
            .doc_part
            .field_by_name_and_type(name, field_type)
            .map(|f| f.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::Field, format!("{name}:{field_type}"), self.path()))?;
        self.doc_part.remove_field(&identifier);
        mark_removed(&mut self.changes.fields, &identifier);
        Ok(())
    }

    /// Add an array scalar column.
    pub fn add_scalar(
        &mut self,
        field_type: FieldType,
        identifier: impl Into<String>,
    ) -> Result<&mut Self, CatalogError> {
        let scalar = Scalar::new(field_type, identifier);
        let identifier = scalar.identifier().to_string();
        ensure_not_removed(&self.changes.scalars, &identifier, ElementKind::Scalar, field_type)?;
        self.doc_part.insert_scalar(scalar)?;
        mark_added(&mut self.changes.scalars, &identifier);
        Ok(self)
    }

    /// Remove the scalar of type `field_type`.
    pub fn remove_scalar(&mut self, field_type: FieldType) -> Result<(), CatalogError> {
        let identifier = self
            .doc_part
            .scalar_by_type(field_type)
            .map(|s| s.identifier().to_string())
            .ok_or_else(|| missing(ElementKind::Scalar, field_type, self.path()))?;
        self.doc_part.remove_scalar(&identifier);
        mark_removed(&mut self.changes.scalars, &identifier);
        Ok(())
    }

    /// Add a physical index without columns.
    pub fn add_doc_part_index(
        &mut self,
        identifier: impl Into<String>,
        unique: bool,
    ) -> Result<DocPartIndexMut<'_>, CatalogError> {
        let index = DocPartIndex::new(identifier, unique);
        let identifier = index.identifier().to_string();
        ensure_not_removed(&self.changes.indexes, &identifier, ElementKind::DocPartIndex, &identifier)?;
        self.doc_part.insert_doc_part_index(index)?;
        mark_added(&mut self.changes.indexes, &identifier);
        Ok(DocPartIndexMut {
            doc_part: &mut *self.doc_part,
            identifier,
        })
    }

    /// Mutable handle on a physical index added by this overlay.
    ///
    /// Committed physical indexes cannot be altered, only removed.
    pub fn doc_part_index_mut(&mut self, identifier: &str) -> Result<DocPartIndexMut<'_>, CatalogError> {
        if self.doc_part.doc_part_index_by_identifier(identifier).is_none() {
            return Err(missing(ElementKind::DocPartIndex, identifier, self.path()));
        }
        if self.changes.indexes.get(identifier) != Some(&ChangeTag::Added) {
            return Err(CatalogError::ImmutableDocPartIndex {
                index: identifier.to_string(),
            });
        }
        Ok(DocPartIndexMut {
            doc_part: &mut *self.doc_part,
            identifier: identifier.to_string(),
        })
    }

    /// Remove a physical index.
    pub fn remove_doc_part_index(&mut self, identifier: &str) -> Result<(), CatalogError> {
        if self.doc_part.remove_doc_part_index(identifier).is_none() {
            return Err(missing(ElementKind::DocPartIndex, identifier, self.path()));
        }
        mark_removed(&mut self.changes.indexes, identifier);
        Ok(())
    }
}

impl Deref for DocPartMut<'_> {
    type Target = DocPart;

    fn deref(&self) -> &DocPart {
        &*self.doc_part
    }
}

/// Mutable handle on a physical index added by an overlay.
#[derive(Debug)]
pub struct DocPartIndexMut<'a> {
    doc_part: &'a mut DocPart,
    identifier: String,
}

impl DocPartIndexMut<'_> {
    /// The physical index name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Columns added so far.
    pub fn columns(&self) -> &[DocPartIndexColumn] {
        self.doc_part
            .doc_part_index_by_identifier(&self.identifier)
            .map(DocPartIndex::columns)
            .unwrap_or_default()
    }

    /// Append a column over the field with identifier `field`.
    pub fn add_column(&mut self, field: &str, ordering: FieldIndexOrdering) -> Result<&mut Self, CatalogError> {
        self.doc_part
            .add_index_column(&self.identifier, field, ordering)?;
        Ok(self)
    }
}
