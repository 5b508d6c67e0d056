//! catalog::doc_part
//!
//! Doc parts and their leaves: fields, array scalars, and physical indexes.
//!
//! A doc part is one relational table. Its [`TableRef`] says where in the
//! document structure the rows come from; its identifier is the physical
//! table name. Fields map (name, type) pairs to columns, scalars map array
//! element types to columns, and doc part indexes are the physical indexes
//! created on the table.

use std::fmt;

use super::entry::{CatalogEntry, EntryClash, EntryMap};
use super::error::{CatalogError, ElementKind, ElementPath};
use crate::core::types::{FieldIndexOrdering, FieldType, TableRef};

/// A typed column holding the values of one document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: (String, FieldType),
    identifier: String,
}

impl Field {
    /// Create a field.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: (name.into(), field_type),
            identifier: identifier.into(),
        }
    }

    /// The document key this field stores.
    pub fn name(&self) -> &str {
        &self.key.0
    }

    /// The column name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The scalar type stored in the column.
    pub fn field_type(&self) -> FieldType {
        self.key.1
    }
}

impl CatalogEntry for Field {
    type Key = (String, FieldType);

    fn key(&self) -> &Self::Key {
        &self.key
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name(), self.field_type())
    }
}

/// A typed column holding the scalar elements of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    field_type: FieldType,
    identifier: String,
}

impl Scalar {
    /// Create a scalar.
    pub fn new(field_type: FieldType, identifier: impl Into<String>) -> Self {
        Self {
            field_type,
            identifier: identifier.into(),
        }
    }

    /// The element type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// The column name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl CatalogEntry for Scalar {
    type Key = FieldType;

    fn key(&self) -> &FieldType {
        &self.field_type
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// One column of a physical index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPartIndexColumn {
    /// Identifier of the indexed field.
    pub identifier: String,
    /// Sort direction.
    pub ordering: FieldIndexOrdering,
}

/// A physical index on one doc part table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPartIndex {
    identifier: String,
    unique: bool,
    columns: Vec<DocPartIndexColumn>,
}

impl DocPartIndex {
    /// Create an index without columns.
    pub fn new(identifier: impl Into<String>, unique: bool) -> Self {
        Self {
            identifier: identifier.into(),
            unique,
            columns: Vec::new(),
        }
    }

    /// Create an index with its columns.
    pub fn with_columns(
        identifier: impl Into<String>,
        unique: bool,
        columns: impl IntoIterator<Item = (String, FieldIndexOrdering)>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            unique,
            columns: columns
                .into_iter()
                .map(|(identifier, ordering)| DocPartIndexColumn {
                    identifier,
                    ordering,
                })
                .collect(),
        }
    }

    /// The physical index name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether the index enforces uniqueness.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Columns in index order.
    pub fn columns(&self) -> &[DocPartIndexColumn] {
        &self.columns
    }

    /// Whether some column indexes the given field identifier.
    pub fn covers_column(&self, identifier: &str) -> bool {
        self.columns.iter().any(|c| c.identifier == identifier)
    }

    /// Whether both indexes would build the same physical structure.
    pub fn same_definition(&self, other: &DocPartIndex) -> bool {
        self.unique == other.unique && self.columns == other.columns
    }
}

impl CatalogEntry for DocPartIndex {
    type Key = String;

    fn key(&self) -> &String {
        &self.identifier
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// One shredded table of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPart {
    table_ref: TableRef,
    identifier: String,
    fields: EntryMap<Field>,
    scalars: EntryMap<Scalar>,
    indexes: EntryMap<DocPartIndex>,
}

impl DocPart {
    /// Create an empty doc part.
    pub fn new(table_ref: TableRef, identifier: impl Into<String>) -> Self {
        Self {
            table_ref,
            identifier: identifier.into(),
            fields: EntryMap::new(),
            scalars: EntryMap::new(),
            indexes: EntryMap::new(),
        }
    }

    /// Position of this doc part in the document structure.
    pub fn table_ref(&self) -> &TableRef {
        &self.table_ref
    }

    /// The physical table name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Look up a field by column identifier.
    pub fn field_by_identifier(&self, identifier: &str) -> Option<&Field> {
        self.fields.get(identifier)
    }

    /// Look up the field storing `name` values of type `field_type`.
    pub fn field_by_name_and_type(&self, name: &str, field_type: FieldType) -> Option<&Field> {
        self.fields.get_by_key(&(name.to_string(), field_type))
    }

    /// Every typed field storing `name`, in type order.
    pub fn fields_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Field> + 'a {
        let range = (name.to_string(), FieldType::MIN)..=(name.to_string(), FieldType::MAX);
        self.fields.range_by_key(range)
    }

    /// Whether at least one field stores `name`.
    pub fn has_field_named(&self, name: &str) -> bool {
        self.fields_by_name(name).next().is_some()
    }

    /// Fields in identifier order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Look up a scalar by element type.
    pub fn scalar_by_type(&self, field_type: FieldType) -> Option<&Scalar> {
        self.scalars.get_by_key(&field_type)
    }

    /// Look up a scalar by column identifier.
    pub fn scalar_by_identifier(&self, identifier: &str) -> Option<&Scalar> {
        self.scalars.get(identifier)
    }

    /// Scalars in identifier order.
    pub fn scalars(&self) -> impl Iterator<Item = &Scalar> {
        self.scalars.iter()
    }

    /// Look up a physical index.
    pub fn doc_part_index_by_identifier(&self, identifier: &str) -> Option<&DocPartIndex> {
        self.indexes.get(identifier)
    }

    /// Physical indexes in identifier order.
    pub fn doc_part_indexes(&self) -> impl Iterator<Item = &DocPartIndex> {
        self.indexes.iter()
    }

    /// Add a field.
    pub fn insert_field(&mut self, field: Field) -> Result<(), CatalogError> {
        let (key, identifier) = (field.to_string(), field.identifier().to_string());
        self.fields
            .insert(field)
            .map(|_| ())
            .map_err(|clash| self.clash(clash, ElementKind::Field, key, identifier))
    }

    /// Remove a field by identifier.
    pub fn remove_field(&mut self, identifier: &str) -> Option<Field> {
        self.fields.remove(identifier).map(unwrap_or_clone)
    }

    /// Add a scalar.
    pub fn insert_scalar(&mut self, scalar: Scalar) -> Result<(), CatalogError> {
        let (key, identifier) = (
            scalar.field_type().to_string(),
            scalar.identifier().to_string(),
        );
        self.scalars
            .insert(scalar)
            .map(|_| ())
            .map_err(|clash| self.clash(clash, ElementKind::Scalar, key, identifier))
    }

    /// Remove a scalar by identifier.
    pub fn remove_scalar(&mut self, identifier: &str) -> Option<Scalar> {
        self.scalars.remove(identifier).map(unwrap_or_clone)
    }

    /// Add a physical index.
    ///
    /// Every column must name a field of this doc part, at most once.
    pub fn insert_doc_part_index(&mut self, index: DocPartIndex) -> Result<(), CatalogError> {
        for (i, column) in index.columns().iter().enumerate() {
            self.check_column(index.identifier(), &column.identifier)?;
            if index.columns()[..i]
                .iter()
                .any(|c| c.identifier == column.identifier)
            {
                return Err(CatalogError::DuplicateName {
                    kind: ElementKind::Column,
                    key: column.identifier.clone(),
                    parent: self.path().child(index.identifier()),
                });
            }
        }
        let identifier = index.identifier().to_string();
        self.indexes
            .insert(index)
            .map(|_| ())
            .map_err(|clash| self.clash(clash, ElementKind::DocPartIndex, identifier.clone(), identifier))
    }

    /// Append a column to a physical index of this doc part.
    pub fn add_index_column(
        &mut self,
        index: &str,
        column: &str,
        ordering: FieldIndexOrdering,
    ) -> Result<(), CatalogError> {
        self.check_column(index, column)?;
        let parent = self.path();
        let path = parent.child(index);
        let Some(target) = self.indexes.get_mut(index) else {
            return Err(CatalogError::NotFound {
                kind: ElementKind::DocPartIndex,
                key: index.to_string(),
                parent,
            });
        };
        if target.covers_column(column) {
            return Err(CatalogError::DuplicateName {
                kind: ElementKind::Column,
                key: column.to_string(),
                parent: path,
            });
        }
        target.columns.push(DocPartIndexColumn {
            identifier: column.to_string(),
            ordering,
        });
        Ok(())
    }

    /// Replace a physical index with the same identifier.
    pub(crate) fn replace_doc_part_index(&mut self, index: DocPartIndex) -> Result<(), CatalogError> {
        let identifier = index.identifier().to_string();
        self.indexes
            .replace(index)
            .map_err(|clash| self.clash(clash, ElementKind::DocPartIndex, identifier.clone(), identifier))
    }

    /// Remove a physical index.
    pub fn remove_doc_part_index(&mut self, identifier: &str) -> Option<DocPartIndex> {
        self.indexes.remove(identifier).map(unwrap_or_clone)
    }

    fn check_column(&self, index: &str, column: &str) -> Result<(), CatalogError> {
        if self.fields.contains_id(column) {
            Ok(())
        } else {
            Err(CatalogError::UnknownColumn {
                index: index.to_string(),
                column: column.to_string(),
                table_ref: self.table_ref.clone(),
            })
        }
    }

    fn path(&self) -> ElementPath {
        ElementPath::root().child(&self.table_ref)
    }

    fn clash(&self, clash: EntryClash, kind: ElementKind, key: String, identifier: String) -> CatalogError {
        match clash {
            EntryClash::Key => CatalogError::DuplicateName {
                kind,
                key,
                parent: self.path(),
            },
            EntryClash::Identifier => CatalogError::DuplicateIdentifier {
                kind,
                identifier,
                parent: self.path(),
            },
        }
    }
}

impl CatalogEntry for DocPart {
    type Key = TableRef;

    fn key(&self) -> &TableRef {
        &self.table_ref
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

pub(crate) fn unwrap_or_clone<T: Clone>(arc: std::sync::Arc<T>) -> T {
    std::sync::Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone())
}
