//! merge::strategies::index
//!
//! Logical index strategies, where the coupling between logical and
//! physical indexes is enforced.
//!
//! # Add and modify
//!
//! 1. [`Conflicting`](IndexMergeStrategy::Conflicting): another committed
//!    index already has this one's identity
//! 2. [`MissingDocPartIndex`](IndexMergeStrategy::MissingDocPartIndex): a doc
//!    part of the overlay needs a physical index for it and has none
//! 3. [`New`](IndexMergeStrategy::New): added indexes are inserted
//! 4. [`ConcurrentlyRemoved`](IndexMergeStrategy::ConcurrentlyRemoved): a
//!    modified index is no longer committed
//! 5. [`Children`](IndexMergeStrategy::Children): modified indexes replace
//!    the committed definition
//!
//! Modifications run the same checks as additions.
//!
//! # Remove
//!
//! 1. [`OrphanDocPartIndex`](IndexRemoveStrategy::OrphanDocPartIndex): a
//!    physical index of the overlay would be left without a logical index
//! 2. [`NotExistent`](IndexRemoveStrategy::NotExistent): already removed by
//!    a concurrent merge, nothing to do
//! 3. [`Delete`](IndexRemoveStrategy::Delete)

use crate::catalog::doc_part::{DocPart, DocPartIndex};
use crate::catalog::error::ElementKind;
use crate::catalog::index::Index;
use crate::catalog::snapshot::Collection;
use crate::core::types::TableRef;
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{MergeContext, MergeStrategy};
use crate::overlay::ChangeTag;

type Ctx<'a> = MergeContext<'a, &'a Collection, Index>;

/// Strategies for added or modified logical indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMergeStrategy {
    Conflicting,
    MissingDocPartIndex,
    New,
    ConcurrentlyRemoved,
    Children,
}

/// The committed index holding the changed index's identity.
fn existing<'a>(ctx: &Ctx<'a>) -> Option<&'a Index> {
    let committed = ctx.committed_parent?;
    let changed = ctx.changed;
    let same_name = committed
        .index_by_name(changed.name())
        .filter(|_| ctx.tag == ChangeTag::Added);
    same_name.or_else(|| {
        committed.indexes().find(|index| {
            index.name() != changed.name()
                && index.same_definition(changed)
                && !ctx.siblings.was_removed(index.name())
        })
    })
}

/// First doc part of the overlay lacking a physical index for the change.
fn unsatisfied<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPart> {
    ctx.uncommitted_parent
        .unsatisfied_doc_parts(ctx.changed)
        .next()
}

impl<'a> MergeStrategy<'a> for IndexMergeStrategy {
    type Parent = &'a Collection;
    type Changed = Index;
    type Target = Collection;

    const CHECKS: &'static [Self] = &[
        Self::Conflicting,
        Self::MissingDocPartIndex,
        Self::New,
        Self::ConcurrentlyRemoved,
    ];
    const DEFAULT: Self = Self::Children;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::Conflicting => "index.conflicting",
            Self::MissingDocPartIndex => "index.missing_doc_part_index",
            Self::New => "index.new",
            Self::ConcurrentlyRemoved => "index.concurrently_removed",
            Self::Children => "index.children",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::Conflicting => existing(ctx).is_some(),
            Self::MissingDocPartIndex => unsatisfied(ctx).is_some(),
            Self::New => ctx.tag == ChangeTag::Added,
            Self::ConcurrentlyRemoved => {
                ctx.tag == ChangeTag::Modified
                    && ctx
                        .committed_parent
                        .and_then(|c| c.index_by_name(ctx.changed.name()))
                        .is_none()
            }
            Self::Children => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, collection: &mut Collection) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::Conflicting => Err(ctx.conflict(
                self.id(),
                ConflictReason::IndexAlreadyExists {
                    name: changed.name().to_string(),
                    existing: existing(ctx)
                        .map(|index| index.name().to_string())
                        .unwrap_or_default(),
                },
            )),
            Self::MissingDocPartIndex => {
                let (table_ref, doc_part) = unsatisfied(ctx)
                    .map(|dp| (dp.table_ref().clone(), dp.identifier().to_string()))
                    .unwrap_or_else(|| (TableRef::root(), String::new()));
                Err(ctx.conflict(
                    self.id(),
                    ConflictReason::MissingDocPartIndex {
                        index: changed.name().to_string(),
                        table_ref,
                        doc_part,
                    },
                ))
            }
            Self::New => collection
                .insert_index(changed.clone())
                .map(|_| ())
                .map_err(|e| ctx.rejected(self.id(), e)),
            Self::ConcurrentlyRemoved => Err(ctx.conflict(
                self.id(),
                ConflictReason::ConcurrentlyRemoved {
                    kind: ElementKind::Index,
                    key: changed.name().to_string(),
                },
            )),
            Self::Children => collection
                .replace_index(changed.clone())
                .map_err(|e| ctx.rejected(self.id(), e)),
        }
    }
}

/// Strategies for removed logical indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRemoveStrategy {
    OrphanDocPartIndex,
    NotExistent,
    Delete,
}

/// A physical index of the overlay only the removed index was anchoring.
fn orphan<'a>(ctx: &Ctx<'a>) -> Option<(&'a DocPart, &'a DocPartIndex)> {
    let collection = ctx.uncommitted_parent;
    collection.doc_parts().find_map(|doc_part| {
        doc_part
            .doc_part_indexes()
            .find(|dpi| {
                ctx.changed.is_compatible(doc_part, dpi)
                    && collection.anchoring_indexes(doc_part, dpi).next().is_none()
            })
            .map(|dpi| (doc_part, dpi))
    })
}

impl<'a> MergeStrategy<'a> for IndexRemoveStrategy {
    type Parent = &'a Collection;
    type Changed = Index;
    type Target = Collection;

    const CHECKS: &'static [Self] = &[Self::OrphanDocPartIndex, Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::OrphanDocPartIndex => "index.orphan_doc_part_index",
            Self::NotExistent => "index.not_existent",
            Self::Delete => "index.delete",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::OrphanDocPartIndex => orphan(ctx).is_some(),
            Self::NotExistent => ctx
                .committed_parent
                .and_then(|c| c.index_by_name(ctx.changed.name()))
                .is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, collection: &mut Collection) -> Result<(), MergeConflict> {
        match self {
            Self::OrphanDocPartIndex => {
                let (doc_part, doc_part_index) = orphan(ctx)
                    .map(|(dp, dpi)| (dp.identifier().to_string(), dpi.identifier().to_string()))
                    .unwrap_or_default();
                Err(ctx.conflict(
                    self.id(),
                    ConflictReason::OrphanDocPartIndex {
                        index: ctx.changed.name().to_string(),
                        doc_part_index,
                        doc_part,
                    },
                ))
            }
            Self::NotExistent => Ok(()),
            Self::Delete => {
                collection.remove_index(ctx.changed.name());
                Ok(())
            }
        }
    }
}
