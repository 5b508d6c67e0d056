//! docpart-catalog - A multi-version schema catalog for shredded documents
//!
//! Documents are stored relationally by splitting them into doc parts: one
//! table per nesting path, with typed columns per field. This crate keeps
//! the catalog describing those tables (databases, collections, doc parts,
//! fields, array scalars, physical and logical indexes) as immutable
//! snapshots that many readers share while writers prepare changes in
//! private overlays and merge them one at a time.
//!
//! # Architecture
//!
//! - [`core`] - Value types (table refs, field types) and configuration
//! - [`catalog`] - Persistent snapshot tree, builder, dumps, verification
//! - [`overlay`] - Mutable working copies that record what they changed
//! - [`merge`] - Strategy-driven merging of an overlay into a snapshot
//! - [`engine`] - The repository, its stages, and the merge ledger
//! - [`cli`] - The `catalogctl` inspection tool
//!
//! # Correctness Invariants
//!
//! 1. A published snapshot is never mutated
//! 2. Merges are totally ordered and each is all-or-nothing
//! 3. Every doc part index is anchored by a logical index, and every logical
//!    index is backed on each doc part that can hold it
//!
//! # Example
//!
//! ```
//! use docpart_catalog::core::types::{FieldIndexOrdering, FieldType, TableRef};
//! use docpart_catalog::engine::Repository;
//!
//! let repository = Repository::new();
//! let mut overlay = repository.open_snapshot_stage().new_overlay();
//! {
//!     let mut db = overlay.add_database("dbName1", "dbId1").unwrap();
//!     let mut col = db.add_collection("colName1", "colId1").unwrap();
//!     let mut dp = col.add_doc_part(TableRef::root(), "docPartId1").unwrap();
//!     dp.add_field("fieldName1", "fieldId1", FieldType::Integer).unwrap();
//!     dp.add_doc_part_index("docPartIndexId1", false)
//!         .unwrap()
//!         .add_column("fieldId1", FieldIndexOrdering::Asc)
//!         .unwrap();
//!     col.add_index("idxName1", false)
//!         .unwrap()
//!         .add_field(TableRef::root(), "fieldName1", FieldIndexOrdering::Asc)
//!         .unwrap();
//! }
//!
//! let committed = repository.merge(overlay).unwrap();
//! assert!(committed.database_by_name("dbName1").is_some());
//! ```

pub mod catalog;
pub mod cli;
pub mod core;
pub mod engine;
pub mod merge;
pub mod overlay;

pub use catalog::{CatalogError, Snapshot};
pub use engine::{MergerStage, Repository, SnapshotStage};
pub use merge::MergeConflict;
pub use overlay::SnapshotOverlay;
