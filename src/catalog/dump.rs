//! catalog::dump
//!
//! Serializable image of a snapshot.
//!
//! # Architecture
//!
//! The catalog never persists itself. An external loader reads the backend's
//! catalog tables at startup and rebuilds a snapshot; an external writer
//! reads one out. [`SnapshotDump`] is the seam both sides use: a plain serde
//! tree that converts from a snapshot and back through the
//! [`SnapshotBuilder`], so a loaded dump obeys every uniqueness rule the
//! builder enforces.
//!
//! The dump is canonical: elements are emitted in a fixed order, so equal
//! snapshots serialize to equal bytes and hash to equal fingerprints.
//!
//! # Example
//!
//! ```
//! use docpart_catalog::catalog::dump::SnapshotDump;
//! use docpart_catalog::catalog::Snapshot;
//!
//! let json = r#"{"databases":[{"name":"d","identifier":"d_id","collections":[]}]}"#;
//! let snapshot = SnapshotDump::from_json(json).unwrap().into_snapshot().unwrap();
//! assert!(snapshot.database_by_name("d").is_some());
//!
//! let again = SnapshotDump::from(&snapshot).into_snapshot().unwrap();
//! assert_eq!(snapshot, again);
//! assert_eq!(snapshot.fingerprint().unwrap(), again.fingerprint().unwrap());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builder::SnapshotBuilder;
use super::doc_part::{DocPart, DocPartIndex, Field, Scalar};
use super::error::CatalogError;
use super::index::Index;
use super::snapshot::{Collection, Database, Snapshot};
use crate::core::types::{FieldIndexOrdering, FieldType, Fingerprint, TableRef};

/// Errors from dump conversion.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(String),

    #[error("failed to parse snapshot dump: {0}")]
    Deserialize(String),

    #[error("snapshot dump is not a valid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Whole-catalog dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotDump {
    #[serde(default)]
    pub databases: Vec<DatabaseDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseDump {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub collections: Vec<CollectionDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionDump {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub doc_parts: Vec<DocPartDump>,
    #[serde(default)]
    pub indexes: Vec<IndexDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocPartDump {
    pub table_ref: TableRef,
    pub identifier: String,
    #[serde(default)]
    pub fields: Vec<FieldDump>,
    #[serde(default)]
    pub scalars: Vec<ScalarDump>,
    #[serde(default)]
    pub indexes: Vec<DocPartIndexDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDump {
    pub name: String,
    pub identifier: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarDump {
    pub identifier: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocPartIndexDump {
    pub identifier: String,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<ColumnDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDump {
    pub identifier: String,
    pub ordering: FieldIndexOrdering,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDump {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    pub fields: Vec<IndexFieldDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexFieldDump {
    pub table_ref: TableRef,
    pub name: String,
    pub ordering: FieldIndexOrdering,
}

impl SnapshotDump {
    /// Parse a JSON dump.
    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        serde_json::from_str(json).map_err(|e| DumpError::Deserialize(e.to_string()))
    }

    /// Compact JSON, the canonical form.
    pub fn to_json(&self) -> Result<String, DumpError> {
        serde_json::to_string(self).map_err(|e| DumpError::Serialize(e.to_string()))
    }

    /// Indented JSON for humans.
    pub fn to_json_pretty(&self) -> Result<String, DumpError> {
        serde_json::to_string_pretty(self).map_err(|e| DumpError::Serialize(e.to_string()))
    }

    /// Rebuild the snapshot through the builder.
    pub fn into_snapshot(self) -> Result<Snapshot, CatalogError> {
        let mut builder = SnapshotBuilder::new();
        for db in self.databases {
            let database = builder.insert_database(Database::new(db.name, db.identifier))?;
            for col in db.collections {
                load_collection(database, col)?;
            }
        }
        Ok(builder.build())
    }
}

fn load_collection(database: &mut Database, col: CollectionDump) -> Result<(), CatalogError> {
    let collection = database.insert_collection(Collection::new(col.name, col.identifier))?;
    for dp in col.doc_parts {
        let doc_part = collection.insert_doc_part(DocPart::new(dp.table_ref, dp.identifier))?;
        for field in dp.fields {
            doc_part.insert_field(Field::new(field.name, field.identifier, field.field_type))?;
        }
        for scalar in dp.scalars {
            doc_part.insert_scalar(Scalar::new(scalar.field_type, scalar.identifier))?;
        }
        for dpi in dp.indexes {
            doc_part.insert_doc_part_index(DocPartIndex::with_columns(
                dpi.identifier,
                dpi.unique,
                dpi.columns.into_iter().map(|c| (c.identifier, c.ordering)),
            ))?;
        }
    }
    for idx in col.indexes {
        let mut index = Index::new(idx.name, idx.unique);
        for field in idx.fields {
            index.push_field(field.table_ref, field.name, field.ordering)?;
        }
        collection.insert_index(index)?;
    }
    Ok(())
}

impl From<&Snapshot> for SnapshotDump {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            databases: snapshot.databases().map(DatabaseDump::from).collect(),
        }
    }
}

impl From<&Database> for DatabaseDump {
    fn from(db: &Database) -> Self {
        Self {
            name: db.name().to_string(),
            identifier: db.identifier().to_string(),
            collections: db.collections().map(CollectionDump::from).collect(),
        }
    }
}

impl From<&Collection> for CollectionDump {
    fn from(col: &Collection) -> Self {
        Self {
            name: col.name().to_string(),
            identifier: col.identifier().to_string(),
            doc_parts: col.doc_parts().map(DocPartDump::from).collect(),
            indexes: col.indexes().map(IndexDump::from).collect(),
        }
    }
}

impl From<&DocPart> for DocPartDump {
    fn from(dp: &DocPart) -> Self {
        Self {
            table_ref: dp.table_ref().clone(),
            identifier: dp.identifier().to_string(),
            fields: dp
                .fields()
                .map(|f| FieldDump {
                    name: f.name().to_string(),
                    identifier: f.identifier().to_string(),
                    field_type: f.field_type(),
                })
                .collect(),
            scalars: dp
                .scalars()
                .map(|s| ScalarDump {
                    identifier: s.identifier().to_string(),
                    field_type: s.field_type(),
                })
                .collect(),
            indexes: dp
                .doc_part_indexes()
                .map(|dpi| DocPartIndexDump {
                    identifier: dpi.identifier().to_string(),
                    unique: dpi.is_unique(),
                    columns: dpi
                        .columns()
                        .iter()
                        .map(|c| ColumnDump {
                            identifier: c.identifier.clone(),
                            ordering: c.ordering,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<&Index> for IndexDump {
    fn from(idx: &Index) -> Self {
        Self {
            name: idx.name().to_string(),
            unique: idx.is_unique(),
            fields: idx
                .fields()
                .iter()
                .map(|f| IndexFieldDump {
                    table_ref: f.table_ref.clone(),
                    name: f.name.clone(),
                    ordering: f.ordering,
                })
                .collect(),
        }
    }
}

impl Snapshot {
    /// Content hash of the canonical dump.
    pub fn fingerprint(&self) -> Result<Fingerprint, DumpError> {
        let json = SnapshotDump::from(self).to_json()?;
        Ok(Fingerprint::compute(json.as_bytes()))
    }
}
