//! merge
//!
//! Conflict detection and folding of overlays into committed snapshots.
//!
//! # Modules
//!
//! - [`merger`] - Walks an overlay's changes
//! - [`strategy`] - Strategy framework: context, ordering, picking
//! - [`strategies`] - Concrete strategy families per element kind
//! - [`coupling`] - Index coupling checks on each folded collection
//! - [`conflict`] - The conflict error

pub mod conflict;
pub mod coupling;
pub mod merger;
pub mod strategies;
pub mod strategy;

pub use conflict::{ConflictReason, MergeConflict, StrategyId};
pub use merger::SnapshotMerger;
pub use strategy::{MergeContext, MergeStrategy};
