//! catalog::verify
//!
//! Invariant verification for snapshots.
//!
//! # Checks
//!
//! - Every nested doc part has its parent doc part
//! - Every doc part index column names a field of its doc part
//! - Every logical index is backed on each doc part that requires it
//! - Every doc part index is anchored by some logical index
//!
//! Sibling uniqueness is guaranteed by construction and is not rechecked.
//!
//! # Invariants
//!
//! - Never mutates the snapshot
//! - Deterministic: violations are reported in tree order

use thiserror::Error;

use super::error::ElementPath;
use super::snapshot::{Collection, Snapshot};
use crate::core::types::TableRef;

/// A violated catalog invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("doc part {table_ref} in {collection} has no parent doc part")]
    OrphanDocPart {
        collection: ElementPath,
        table_ref: TableRef,
    },

    #[error("doc part index '{index}' on {table_ref} in {collection} references unknown column '{column}'")]
    DanglingColumn {
        collection: ElementPath,
        table_ref: TableRef,
        index: String,
        column: String,
    },

    #[error("index '{index}' in {collection} has no doc part index on {table_ref}")]
    MissingDocPartIndex {
        collection: ElementPath,
        index: String,
        table_ref: TableRef,
    },

    #[error("doc part index '{index}' on {table_ref} in {collection} is not anchored by any index")]
    UnanchoredDocPartIndex {
        collection: ElementPath,
        table_ref: TableRef,
        index: String,
    },
}

/// Result of verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Violations found
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Check every catalog invariant on `snapshot`.
pub fn verify_snapshot(snapshot: &Snapshot) -> VerifyResult {
    let errors: Vec<VerifyError> = snapshot
        .databases()
        .flat_map(|db| {
            db.collections().flat_map(move |col| {
                let path = ElementPath::root().child(db.name()).child(col.name());
                verify_collection(col, &path)
            })
        })
        .collect();

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}

/// Check the invariants of one collection, located at `path`.
///
/// Every invariant is local to a collection, so a snapshot is valid exactly
/// when all of its collections are.
pub fn verify_collection(col: &Collection, path: &ElementPath) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    for dp in col.doc_parts() {
        if let Some(parent) = dp.table_ref().parent() {
            if col.doc_part_by_table_ref(&parent).is_none() {
                errors.push(VerifyError::OrphanDocPart {
                    collection: path.clone(),
                    table_ref: dp.table_ref().clone(),
                });
            }
        }

        for dpi in dp.doc_part_indexes() {
            for column in dpi.columns() {
                if dp.field_by_identifier(&column.identifier).is_none() {
                    errors.push(VerifyError::DanglingColumn {
                        collection: path.clone(),
                        table_ref: dp.table_ref().clone(),
                        index: dpi.identifier().to_string(),
                        column: column.identifier.clone(),
                    });
                }
            }
            if col.anchoring_indexes(dp, dpi).next().is_none() {
                errors.push(VerifyError::UnanchoredDocPartIndex {
                    collection: path.clone(),
                    table_ref: dp.table_ref().clone(),
                    index: dpi.identifier().to_string(),
                });
            }
        }
    }

    for index in col.indexes() {
        for dp in col.unsatisfied_doc_parts(index) {
            errors.push(VerifyError::MissingDocPartIndex {
                collection: path.clone(),
                index: index.name().to_string(),
                table_ref: dp.table_ref().clone(),
            });
        }
    }

    errors
}
