//! merge::strategies::collection
//!
//! Collection strategies. Same shape as the database ones, one level down.

use crate::catalog::error::ElementKind;
use crate::catalog::snapshot::{Collection, Database};
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{MergeContext, MergeStrategy};
use crate::overlay::ChangeTag;

type Ctx<'a> = MergeContext<'a, &'a Database, Collection>;

/// Strategies for added or modified collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMergeStrategy {
    SameIdentifier,
    SameName,
    ConcurrentlyRemoved,
    New,
    Children,
}

fn committed<'a>(ctx: &Ctx<'a>) -> Option<&'a Collection> {
    ctx.committed_parent
        .and_then(|db| db.collection_by_identifier(ctx.changed.identifier()))
}

fn committed_namesake<'a>(ctx: &Ctx<'a>) -> Option<&'a Collection> {
    ctx.committed_parent
        .and_then(|db| db.collection_by_name(ctx.changed.name()))
        .filter(|c| c.identifier() != ctx.changed.identifier() && !ctx.siblings.was_removed(c.identifier()))
}

impl<'a> MergeStrategy<'a> for CollectionMergeStrategy {
    type Parent = &'a Database;
    type Changed = Collection;
    type Target = Database;

    const CHECKS: &'static [Self] = &[
        Self::SameIdentifier,
        Self::SameName,
        Self::ConcurrentlyRemoved,
        Self::New,
    ];
    const DEFAULT: Self = Self::Children;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::SameIdentifier => "collection.same_identifier",
            Self::SameName => "collection.same_name",
            Self::ConcurrentlyRemoved => "collection.concurrently_removed",
            Self::New => "collection.new",
            Self::Children => "collection.children",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::SameIdentifier => committed(ctx).is_some_and(|c| c.name() != ctx.changed.name()),
            Self::SameName => committed_namesake(ctx).is_some(),
            Self::ConcurrentlyRemoved => ctx.tag == ChangeTag::Modified && committed(ctx).is_none(),
            Self::New => ctx.tag == ChangeTag::Added,
            Self::Children => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, database: &mut Database) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::SameIdentifier => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameIdentifier {
                    kind: ElementKind::Collection,
                    identifier: changed.identifier().to_string(),
                    existing: committed(ctx).map(|c| c.name().to_string()).unwrap_or_default(),
                    proposed: changed.name().to_string(),
                },
            )),
            Self::SameName => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameName {
                    kind: ElementKind::Collection,
                    key: changed.name().to_string(),
                    existing: committed_namesake(ctx)
                        .map(|c| c.identifier().to_string())
                        .unwrap_or_default(),
                    proposed: changed.identifier().to_string(),
                },
            )),
            Self::ConcurrentlyRemoved => Err(ctx.conflict(
                self.id(),
                ConflictReason::ConcurrentlyRemoved {
                    kind: ElementKind::Collection,
                    key: changed.name().to_string(),
                },
            )),
            Self::New => {
                if database.collection_by_identifier(changed.identifier()).is_none() {
                    database
                        .insert_collection(Collection::new(changed.name(), changed.identifier()))
                        .map_err(|e| ctx.rejected(self.id(), e))?;
                }
                Ok(())
            }
            Self::Children => Ok(()),
        }
    }
}

/// Strategies for removed collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionRemoveStrategy {
    NotExistent,
    Delete,
}

impl<'a> MergeStrategy<'a> for CollectionRemoveStrategy {
    type Parent = &'a Database;
    type Changed = Collection;
    type Target = Database;

    const CHECKS: &'static [Self] = &[Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::NotExistent => "collection.not_existent",
            Self::Delete => "collection.delete",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::NotExistent => committed(ctx).is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, database: &mut Database) -> Result<(), MergeConflict> {
        if self == Self::Delete {
            database.remove_collection(ctx.changed.identifier());
        }
        Ok(())
    }
}
