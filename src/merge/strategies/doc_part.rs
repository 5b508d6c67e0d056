//! merge::strategies::doc_part
//!
//! Doc part strategies. Doc parts are keyed by table ref where databases and
//! collections are keyed by name.

use crate::catalog::doc_part::DocPart;
use crate::catalog::error::ElementKind;
use crate::catalog::snapshot::Collection;
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{MergeContext, MergeStrategy};
use crate::overlay::ChangeTag;

type Ctx<'a> = MergeContext<'a, &'a Collection, DocPart>;

/// Strategies for added or modified doc parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPartMergeStrategy {
    SameIdentifier,
    SameTableRef,
    ConcurrentlyRemoved,
    New,
    Children,
}

fn committed<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPart> {
    ctx.committed_parent
        .and_then(|c| c.doc_part_by_identifier(ctx.changed.identifier()))
}

fn committed_namesake<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPart> {
    ctx.committed_parent
        .and_then(|c| c.doc_part_by_table_ref(ctx.changed.table_ref()))
        .filter(|dp| dp.identifier() != ctx.changed.identifier() && !ctx.siblings.was_removed(dp.identifier()))
}

impl<'a> MergeStrategy<'a> for DocPartMergeStrategy {
    type Parent = &'a Collection;
    type Changed = DocPart;
    type Target = Collection;

    const CHECKS: &'static [Self] = &[
        Self::SameIdentifier,
        Self::SameTableRef,
        Self::ConcurrentlyRemoved,
        Self::New,
    ];
    const DEFAULT: Self = Self::Children;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::SameIdentifier => "doc_part.same_identifier",
            Self::SameTableRef => "doc_part.same_table_ref",
            Self::ConcurrentlyRemoved => "doc_part.concurrently_removed",
            Self::New => "doc_part.new",
            Self::Children => "doc_part.children",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::SameIdentifier => committed(ctx).is_some_and(|dp| dp.table_ref() != ctx.changed.table_ref()),
            Self::SameTableRef => committed_namesake(ctx).is_some(),
            Self::ConcurrentlyRemoved => ctx.tag == ChangeTag::Modified && committed(ctx).is_none(),
            Self::New => ctx.tag == ChangeTag::Added,
            Self::Children => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, collection: &mut Collection) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::SameIdentifier => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameIdentifier {
                    kind: ElementKind::DocPart,
                    identifier: changed.identifier().to_string(),
                    existing: committed(ctx).map(|dp| dp.table_ref().to_string()).unwrap_or_default(),
                    proposed: changed.table_ref().to_string(),
                },
            )),
            Self::SameTableRef => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameName {
                    kind: ElementKind::DocPart,
                    key: changed.table_ref().to_string(),
                    existing: committed_namesake(ctx)
                        .map(|dp| dp.identifier().to_string())
                        .unwrap_or_default(),
                    proposed: changed.identifier().to_string(),
                },
            )),
            Self::ConcurrentlyRemoved => Err(ctx.conflict(
                self.id(),
                ConflictReason::ConcurrentlyRemoved {
                    kind: ElementKind::DocPart,
                    key: changed.table_ref().to_string(),
                },
            )),
            Self::New => {
                if collection.doc_part_by_identifier(changed.identifier()).is_none() {
                    collection
                        .insert_doc_part(DocPart::new(changed.table_ref().clone(), changed.identifier()))
                        .map_err(|e| ctx.rejected(self.id(), e))?;
                }
                Ok(())
            }
            Self::Children => Ok(()),
        }
    }
}

/// Strategies for removed doc parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPartRemoveStrategy {
    NotExistent,
    /// A concurrent merge nested a doc part the overlay kept under it.
    HasChildren,
    Delete,
}

/// A committed doc part directly under the removed one that the overlay
/// does not remove as well.
fn surviving_child<'a>(ctx: &Ctx<'a>) -> Option<&'a DocPart> {
    let parent = ctx.changed.table_ref();
    ctx.committed_parent?.doc_parts().find(|dp| {
        dp.table_ref().parent().as_ref() == Some(parent) && !ctx.siblings.was_removed(dp.identifier())
    })
}

impl<'a> MergeStrategy<'a> for DocPartRemoveStrategy {
    type Parent = &'a Collection;
    type Changed = DocPart;
    type Target = Collection;

    const CHECKS: &'static [Self] = &[Self::NotExistent, Self::HasChildren];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::NotExistent => "doc_part.not_existent",
            Self::HasChildren => "doc_part.has_children",
            Self::Delete => "doc_part.delete",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::NotExistent => committed(ctx).is_none(),
            Self::HasChildren => surviving_child(ctx).is_some(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, collection: &mut Collection) -> Result<(), MergeConflict> {
        match self {
            Self::NotExistent => Ok(()),
            Self::HasChildren => Err(ctx.conflict(
                self.id(),
                ConflictReason::DocPartHasChildren {
                    table_ref: ctx.changed.table_ref().clone(),
                    child: surviving_child(ctx)
                        .map(|dp| dp.table_ref().to_string())
                        .unwrap_or_default(),
                },
            )),
            Self::Delete => {
                collection.remove_doc_part(ctx.changed.identifier());
                Ok(())
            }
        }
    }
}
