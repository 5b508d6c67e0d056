//! merge::strategy
//!
//! The strategy framework shared by every element kind.
//!
//! # Architecture
//!
//! Each element kind has two strategy families, one for additions and
//! modifications and one for removals. A family is a plain enum whose
//! variants are its strategies; [`MergeStrategy::CHECKS`] fixes the order in
//! which they are tried and [`MergeStrategy::DEFAULT`] runs when none
//! applies. The first applicable strategy either updates the snapshot under
//! construction or rejects the element with a [`MergeConflict`].
//!
//! # Invariants
//!
//! - Strategies are stateless; everything they look at is in the context
//! - A rejecting strategy never touches the target

use crate::catalog::doc_part::DocPart;
use crate::catalog::error::ElementPath;
use crate::catalog::snapshot::Collection;
use crate::overlay::{ChangeTag, SiblingChanges};

use super::conflict::{ConflictReason, MergeConflict, StrategyId};

/// Everything a strategy sees about one changed element.
pub struct MergeContext<'a, P, C> {
    /// The element's parent in the current committed snapshot, if any.
    pub committed_parent: Option<P>,
    /// The element's parent as the overlay sees it.
    pub uncommitted_parent: P,
    /// The changed element; for removals, as it was in the overlay's base.
    pub changed: &'a C,
    /// How the overlay changed the element.
    pub tag: ChangeTag,
    /// Change records of the element and its siblings.
    pub siblings: &'a dyn SiblingChanges,
    /// Location of the parent.
    pub path: &'a ElementPath,
}

impl<P, C> MergeContext<'_, P, C> {
    /// Build a conflict located at this context's parent.
    pub fn conflict(&self, strategy: StrategyId, reason: ConflictReason) -> MergeConflict {
        MergeConflict::new(strategy, self.path, reason)
    }

    /// Build a conflict for a change the snapshot under construction refused.
    pub fn rejected(&self, strategy: StrategyId, error: impl std::fmt::Display) -> MergeConflict {
        self.conflict(strategy, ConflictReason::Rejected(error.to_string()))
    }
}

/// A doc part together with its collection.
///
/// Doc part indexes are anchored by the collection's logical indexes, so
/// their strategies need both.
#[derive(Debug, Clone, Copy)]
pub struct DocPartScope<'a> {
    pub collection: &'a Collection,
    pub doc_part: &'a DocPart,
}

/// One family of merge strategies.
pub trait MergeStrategy<'a>: Copy + std::fmt::Debug + 'static {
    /// Parent element type as passed in the context.
    type Parent: Copy;
    /// Changed element type.
    type Changed: 'a;
    /// Element of the snapshot under construction that the strategy edits.
    type Target;

    /// Strategies tried in order.
    const CHECKS: &'static [Self];
    /// Strategy used when no check applies.
    const DEFAULT: Self;

    /// Stable strategy name.
    fn id(self) -> StrategyId;

    /// Whether the strategy handles this change.
    fn applies(self, ctx: &MergeContext<'a, Self::Parent, Self::Changed>) -> bool;

    /// Apply or reject the change.
    fn execute(
        self,
        ctx: &MergeContext<'a, Self::Parent, Self::Changed>,
        target: &mut Self::Target,
    ) -> Result<(), MergeConflict>;
}

/// The first applicable strategy of family `S`.
pub fn pick<'a, S: MergeStrategy<'a>>(ctx: &MergeContext<'a, S::Parent, S::Changed>) -> S {
    S::CHECKS
        .iter()
        .copied()
        .find(|strategy| strategy.applies(ctx))
        .unwrap_or(S::DEFAULT)
}

/// Pick and run a strategy of family `S`.
pub fn apply<'a, S: MergeStrategy<'a>>(
    ctx: &MergeContext<'a, S::Parent, S::Changed>,
    target: &mut S::Target,
) -> Result<(), MergeConflict> {
    let strategy = pick::<S>(ctx);
    tracing::trace!(strategy = %strategy.id(), path = %ctx.path, tag = %ctx.tag, "applying merge strategy");
    strategy.execute(ctx, target)
}
