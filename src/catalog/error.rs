//! catalog::error
//!
//! Error taxonomy shared by the snapshot tree, the overlay, and the merge
//! engine.
//!
//! # Categories
//!
//! - **Conflicts** ([`CatalogError::Conflict`]): a merge rejected one of the
//!   proposed elements. The committed snapshot is unchanged and the caller
//!   may rebuild its overlay against the newer snapshot and retry.
//! - **Usage errors** (every other variant): operating on absent elements,
//!   duplicating a sibling, and similar caller defects. Not worth retrying.

use std::fmt;

use thiserror::Error;

use crate::core::types::TableRef;
use crate::merge::conflict::MergeConflict;

/// Kind of catalog element, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Database,
    Collection,
    DocPart,
    Field,
    Scalar,
    DocPartIndex,
    Column,
    Index,
    IndexField,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Database => "database",
            ElementKind::Collection => "collection",
            ElementKind::DocPart => "doc part",
            ElementKind::Field => "field",
            ElementKind::Scalar => "scalar",
            ElementKind::DocPartIndex => "doc part index",
            ElementKind::Column => "column",
            ElementKind::Index => "index",
            ElementKind::IndexField => "index field",
        };
        f.write_str(s)
    }
}

/// Location of an element's parent inside the catalog tree.
///
/// Rendered as dot-joined names, e.g. `dbName1.colName1.$root`; the empty
/// path renders as `catalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementPath(Vec<String>);

impl ElementPath {
    /// The catalog root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path by one segment.
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("catalog")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

/// Coarse classification of a [`CatalogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A merge was rejected; retrying against a newer snapshot may succeed.
    MergeConflict,
    /// Caller or implementation defect.
    Usage,
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A sibling with the same name already exists.
    #[error("{kind} '{key}' already exists in {parent}")]
    DuplicateName {
        kind: ElementKind,
        key: String,
        parent: ElementPath,
    },

    /// A sibling already uses the identifier.
    #[error("{kind} identifier '{identifier}' is already used in {parent}")]
    DuplicateIdentifier {
        kind: ElementKind,
        identifier: String,
        parent: ElementPath,
    },

    /// The element does not exist.
    #[error("{kind} '{key}' not found in {parent}")]
    NotFound {
        kind: ElementKind,
        key: String,
        parent: ElementPath,
    },

    /// The element was removed earlier in the same transaction.
    #[error("{kind} '{key}' was removed in this transaction and cannot be added back")]
    RemovedInOverlay { kind: ElementKind, key: String },

    /// A nested doc part was added before its parent doc part.
    #[error("doc part {table_ref} has no parent doc part in {parent}")]
    MissingParentDocPart {
        table_ref: TableRef,
        parent: ElementPath,
    },

    /// A doc part cannot be removed while nested doc parts remain.
    #[error("doc part {table_ref} in {parent} still has nested doc parts")]
    DocPartHasChildren {
        table_ref: TableRef,
        parent: ElementPath,
    },

    /// A doc part index column names no field of its doc part.
    #[error("column '{column}' of doc part index '{index}' names no field of doc part {table_ref}")]
    UnknownColumn {
        index: String,
        column: String,
        table_ref: TableRef,
    },

    /// A committed doc part index cannot be altered.
    #[error("doc part index '{index}' is already committed and cannot be altered")]
    ImmutableDocPartIndex { index: String },

    /// A merge rejected the overlay.
    #[error(transparent)]
    Conflict(#[from] MergeConflict),

    /// A merged snapshot failed invariant verification.
    #[error("merged snapshot failed verification: {0}")]
    Verification(String),
}

impl CatalogError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Conflict(_) => ErrorKind::MergeConflict,
            _ => ErrorKind::Usage,
        }
    }

    /// The merge conflict, if this error is one.
    pub fn as_conflict(&self) -> Option<&MergeConflict> {
        match self {
            CatalogError::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}
