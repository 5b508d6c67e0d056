//! catalog
//!
//! The persistent snapshot tree.
//!
//! # Modules
//!
//! - [`snapshot`] - Snapshot, databases, collections
//! - [`doc_part`] - Doc parts, fields, scalars, physical indexes
//! - [`index`] - Logical indexes and the coupling rules
//! - [`entry`] - Doubly indexed, structurally shared sibling maps
//! - [`builder`] - Builder producing new snapshot versions
//! - [`dump`] - Serializable snapshot image and fingerprints
//! - [`verify`] - Invariant verification
//! - [`error`] - Error taxonomy
//!
//! # Design Principles
//!
//! - A published snapshot is never mutated
//! - New versions share every untouched subtree with their predecessor
//! - Lookups by name and by identifier are logarithmic at every level

pub mod builder;
pub mod doc_part;
pub mod dump;
pub mod entry;
pub mod error;
pub mod index;
pub mod snapshot;
pub mod verify;

pub use builder::SnapshotBuilder;
pub use doc_part::{DocPart, DocPartIndex, DocPartIndexColumn, Field, Scalar};
pub use error::{CatalogError, ElementKind, ElementPath, ErrorKind};
pub use index::{Index, IndexField};
pub use snapshot::{Collection, Database, Snapshot};
pub use verify::{verify_collection, verify_snapshot, VerifyError, VerifyResult};
