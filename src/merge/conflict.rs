//! merge::conflict
//!
//! The error returned when a merge strategy rejects an element.
//!
//! A conflict stores the rejecting strategy, where the rejected element
//! lives, and structured details about what collided. The human readable
//! message is only rendered when the conflict is displayed.

use std::fmt;

use thiserror::Error;

use crate::catalog::error::{ElementKind, ElementPath};
use crate::core::types::TableRef;

/// Stable name of a merge strategy, e.g. `index.conflicting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyId(&'static str);

impl StrategyId {
    pub(crate) const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// The id as a string.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What collided.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    #[error("{kind} identifier '{identifier}' is committed as '{existing}', cannot be used for '{proposed}'")]
    SameIdentifier {
        kind: ElementKind,
        identifier: String,
        existing: String,
        proposed: String,
    },

    #[error("{kind} '{key}' is committed with identifier '{existing}', cannot be added as '{proposed}'")]
    SameName {
        kind: ElementKind,
        key: String,
        existing: String,
        proposed: String,
    },

    #[error("{kind} '{key}' was removed by a concurrent transaction")]
    ConcurrentlyRemoved { kind: ElementKind, key: String },

    #[error("index '{name}' already exists as '{existing}'")]
    IndexAlreadyExists { name: String, existing: String },

    #[error("index '{index}' needs a doc part index on doc part '{doc_part}' ({table_ref}), none was added")]
    MissingDocPartIndex {
        index: String,
        table_ref: TableRef,
        doc_part: String,
    },

    #[error("removing index '{index}' would leave doc part index '{doc_part_index}' on '{doc_part}' without an index")]
    OrphanDocPartIndex {
        index: String,
        doc_part_index: String,
        doc_part: String,
    },

    #[error("doc part index '{proposed}' on '{doc_part}' collides with committed doc part index '{existing}'")]
    DuplicateDocPartIndex {
        proposed: String,
        existing: String,
        doc_part: String,
    },

    #[error("doc part index '{doc_part_index}' on '{doc_part}' does not belong to any index")]
    UnanchoredDocPartIndex {
        doc_part_index: String,
        doc_part: String,
    },

    #[error("doc part index '{doc_part_index}' on '{doc_part}' is still needed by index '{index}'")]
    DocPartIndexStillRequired {
        doc_part_index: String,
        index: String,
        doc_part: String,
    },

    #[error("doc part {table_ref} cannot be removed, doc part {child} is nested under it")]
    DocPartHasChildren { table_ref: TableRef, child: String },

    #[error("field '{field}' is still indexed by doc part index '{doc_part_index}'")]
    FieldInUse { field: String, doc_part_index: String },

    #[error("{0}")]
    Rejected(String),
}

/// A merge rejected by one of its strategies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{strategy} rejected the merge at {path}: {reason}")]
pub struct MergeConflict {
    strategy: StrategyId,
    path: ElementPath,
    reason: ConflictReason,
}

impl MergeConflict {
    pub(crate) fn new(strategy: StrategyId, path: &ElementPath, reason: ConflictReason) -> Self {
        Self {
            strategy,
            path: path.clone(),
            reason,
        }
    }

    /// The strategy that rejected the merge.
    pub fn strategy(&self) -> StrategyId {
        self.strategy
    }

    /// Parent of the rejected element.
    pub fn path(&self) -> &ElementPath {
        &self.path
    }

    /// What collided.
    pub fn reason(&self) -> &ConflictReason {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_colliding_elements() {
        let conflict = MergeConflict::new(
            StrategyId::new("index.conflicting"),
            &ElementPath::root().child("dbName1").child("colName1"),
            ConflictReason::IndexAlreadyExists {
                name: "idxName2".into(),
                existing: "idxName1".into(),
            },
        );
        assert_eq!(conflict.strategy().as_str(), "index.conflicting");
        assert_eq!(
            conflict.to_string(),
            "index.conflicting rejected the merge at dbName1.colName1: \
             index 'idxName2' already exists as 'idxName1'"
        );
    }
}
