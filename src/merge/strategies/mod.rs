//! merge::strategies
//!
//! Strategy families, one module per element kind.
//!
//! | Kind | Add / modify | Remove |
//! |------|--------------|--------|
//! | database | same identifier, same name, concurrently removed, new, children | not existent, delete |
//! | collection | same identifier, same name, concurrently removed, new, children | not existent, delete |
//! | doc part | same identifier, same table ref, concurrently removed, new, children | not existent, has children, delete |
//! | field | same identifier, same name, new | in use, not existent, delete |
//! | scalar | same identifier, same type, new | not existent, delete |
//! | doc part index | conflicting, unanchored, new | still required, not existent, delete |
//! | index | conflicting, missing doc part index, new, concurrently removed, children | orphan doc part index, not existent, delete |

mod collection;
mod database;
mod doc_part;
mod doc_part_index;
mod field;
mod index;

pub use collection::{CollectionMergeStrategy, CollectionRemoveStrategy};
pub use database::{DatabaseMergeStrategy, DatabaseRemoveStrategy};
pub use doc_part::{DocPartMergeStrategy, DocPartRemoveStrategy};
pub use doc_part_index::{DocPartIndexMergeStrategy, DocPartIndexRemoveStrategy};
pub use field::{FieldMergeStrategy, FieldRemoveStrategy, ScalarMergeStrategy, ScalarRemoveStrategy};
pub use index::{IndexMergeStrategy, IndexRemoveStrategy};
