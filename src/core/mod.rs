//! core
//!
//! Value types and configuration shared by the catalog layers.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TableRef, FieldType, FieldIndexOrdering,
//!   Fingerprint
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod types;
