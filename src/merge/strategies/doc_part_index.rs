//! merge::strategies::doc_part_index
//!
//! Physical index strategies.
//!
//! A physical index may only be merged while some logical index of the
//! overlay's collection is compatible with it, and may only be dropped once
//! no logical index of the overlay still needs it.

use crate::catalog::doc_part::{DocPart, DocPartIndex};
use crate::catalog::index::Index;
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{DocPartScope, MergeContext, MergeStrategy};
use crate::overlay::ChangeTag;

type Ctx<'a> = MergeContext<'a, DocPartScope<'a>, DocPartIndex>;

/// Strategies for added doc part indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPartIndexMergeStrategy {
    /// The identifier, or the same physical definition, is already committed.
    Conflicting,
    /// No logical index of the overlay is compatible.
    Unanchored,
    New,
}

fn committed_doc_part<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPart> {
    ctx.committed_parent.map(|scope| scope.doc_part)
}

/// The committed physical index this change collides with.
fn collision<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPartIndex> {
    let doc_part = committed_doc_part(ctx)?;
    let changed = ctx.changed;
    let same_identifier = doc_part
        .doc_part_index_by_identifier(changed.identifier())
        .filter(|_| ctx.tag == ChangeTag::Added);
    same_identifier.or_else(|| {
        doc_part.doc_part_indexes().find(|dpi| {
            dpi.identifier() != changed.identifier()
                && dpi.same_definition(changed)
                && !ctx.siblings.was_removed(dpi.identifier())
        })
    })
}

impl<'a> MergeStrategy<'a> for DocPartIndexMergeStrategy {
    type Parent = DocPartScope<'a>;
    type Changed = DocPartIndex;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::Conflicting, Self::Unanchored];
    const DEFAULT: Self = Self::New;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::Conflicting => "doc_part_index.conflicting",
            Self::Unanchored => "doc_part_index.unanchored",
            Self::New => "doc_part_index.new",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        let scope = ctx.uncommitted_parent;
        match self {
            Self::Conflicting => collision(ctx).is_some(),
            Self::Unanchored => scope
                .collection
                .anchoring_indexes(scope.doc_part, ctx.changed)
                .next()
                .is_none(),
            Self::New => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        let table = ctx.uncommitted_parent.doc_part.identifier().to_string();
        match self {
            Self::Conflicting => Err(ctx.conflict(
                self.id(),
                ConflictReason::DuplicateDocPartIndex {
                    proposed: changed.identifier().to_string(),
                    existing: collision(ctx)
                        .map(|dpi| dpi.identifier().to_string())
                        .unwrap_or_default(),
                    doc_part: table,
                },
            )),
            Self::Unanchored => Err(ctx.conflict(
                self.id(),
                ConflictReason::UnanchoredDocPartIndex {
                    doc_part_index: changed.identifier().to_string(),
                    doc_part: table,
                },
            )),
            Self::New => doc_part
                .insert_doc_part_index(changed.clone())
                .map_err(|e| ctx.rejected(self.id(), e)),
        }
    }
}

/// Strategies for removed doc part indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPartIndexRemoveStrategy {
    /// A logical index of the overlay is left without a physical index.
    StillRequired,
    NotExistent,
    Delete,
}

/// The overlay index that loses its only physical index with this removal.
fn dependent<'a>(ctx: &Ctx<'a>) -> Option<&'a Index> {
    let DocPartScope {
        collection,
        doc_part,
    } = ctx.uncommitted_parent;
    collection.indexes().find(|index| {
        index.is_compatible(doc_part, ctx.changed)
            && index.requires_doc_part_index(doc_part)
            && !index.is_satisfied_by(doc_part)
    })
}

impl<'a> MergeStrategy<'a> for DocPartIndexRemoveStrategy {
    type Parent = DocPartScope<'a>;
    type Changed = DocPartIndex;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::StillRequired, Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::StillRequired => "doc_part_index.still_required",
            Self::NotExistent => "doc_part_index.not_existent",
            Self::Delete => "doc_part_index.delete",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::StillRequired => dependent(ctx).is_some(),
            Self::NotExistent => committed_doc_part(ctx)
                .and_then(|dp| dp.doc_part_index_by_identifier(ctx.changed.identifier()))
                .is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        match self {
            Self::StillRequired => Err(ctx.conflict(
                self.id(),
                ConflictReason::DocPartIndexStillRequired {
                    doc_part_index: ctx.changed.identifier().to_string(),
                    index: dependent(ctx)
                        .map(|index| index.name().to_string())
                        .unwrap_or_default(),
                    doc_part: ctx.uncommitted_parent.doc_part.identifier().to_string(),
                },
            )),
            Self::NotExistent => Ok(()),
            Self::Delete => {
                doc_part.remove_doc_part_index(ctx.changed.identifier());
                Ok(())
            }
        }
    }
}
