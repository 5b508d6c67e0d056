//! merge::strategies::database
//!
//! Database strategies.

use crate::catalog::builder::SnapshotBuilder;
use crate::catalog::error::ElementKind;
use crate::catalog::snapshot::{Database, Snapshot};
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{MergeContext, MergeStrategy};
use crate::overlay::ChangeTag;

type Ctx<'a> = MergeContext<'a, &'a Snapshot, Database>;

/// Strategies for added or modified databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMergeStrategy {
    /// The identifier is committed under another name.
    SameIdentifier,
    /// The name is committed under another identifier.
    SameName,
    /// A modified database is gone from the committed snapshot.
    ConcurrentlyRemoved,
    /// Insert an empty database; its children follow.
    New,
    /// Nothing to do at this level; its children follow.
    Children,
}

fn committed<'a>(ctx: &Ctx<'a>) -> Option<&'a Database> {
    ctx.committed_parent
        .and_then(|s| s.database_by_identifier(ctx.changed.identifier()))
}

fn committed_namesake<'a>(ctx: &Ctx<'a>) -> Option<&'a Database> {
    ctx.committed_parent
        .and_then(|s| s.database_by_name(ctx.changed.name()))
        .filter(|db| db.identifier() != ctx.changed.identifier() && !ctx.siblings.was_removed(db.identifier()))
}

impl<'a> MergeStrategy<'a> for DatabaseMergeStrategy {
    type Parent = &'a Snapshot;
    type Changed = Database;
    type Target = SnapshotBuilder;

    const CHECKS: &'static [Self] = &[
        Self::SameIdentifier,
        Self::SameName,
        Self::ConcurrentlyRemoved,
        Self::New,
    ];
    const DEFAULT: Self = Self::Children;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::SameIdentifier => "database.same_identifier",
            Self::SameName => "database.same_name",
            Self::ConcurrentlyRemoved => "database.concurrently_removed",
            Self::New => "database.new",
            Self::Children => "database.children",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::SameIdentifier => committed(ctx).is_some_and(|db| db.name() != ctx.changed.name()),
            Self::SameName => committed_namesake(ctx).is_some(),
            Self::ConcurrentlyRemoved => ctx.tag == ChangeTag::Modified && committed(ctx).is_none(),
            Self::New => ctx.tag == ChangeTag::Added,
            Self::Children => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, builder: &mut SnapshotBuilder) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::SameIdentifier => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameIdentifier {
                    kind: ElementKind::Database,
                    identifier: changed.identifier().to_string(),
                    existing: committed(ctx).map(|db| db.name().to_string()).unwrap_or_default(),
                    proposed: changed.name().to_string(),
                },
            )),
            Self::SameName => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameName {
                    kind: ElementKind::Database,
                    key: changed.name().to_string(),
                    existing: committed_namesake(ctx)
                        .map(|db| db.identifier().to_string())
                        .unwrap_or_default(),
                    proposed: changed.identifier().to_string(),
                },
            )),
            Self::ConcurrentlyRemoved => Err(ctx.conflict(
                self.id(),
                ConflictReason::ConcurrentlyRemoved {
                    kind: ElementKind::Database,
                    key: changed.name().to_string(),
                },
            )),
            Self::New => {
                if builder.view().database_by_identifier(changed.identifier()).is_none() {
                    builder
                        .insert_database(Database::new(changed.name(), changed.identifier()))
                        .map_err(|e| ctx.rejected(self.id(), e))?;
                }
                Ok(())
            }
            Self::Children => Ok(()),
        }
    }
}

/// Strategies for removed databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseRemoveStrategy {
    /// Already gone from the committed snapshot.
    NotExistent,
    /// Drop the database.
    Delete,
}

impl<'a> MergeStrategy<'a> for DatabaseRemoveStrategy {
    type Parent = &'a Snapshot;
    type Changed = Database;
    type Target = SnapshotBuilder;

    const CHECKS: &'static [Self] = &[Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::NotExistent => "database.not_existent",
            Self::Delete => "database.delete",
        })
    }

    fn applies(self, ctx: &Ctx<'a>) -> bool {
        match self {
            Self::NotExistent => committed(ctx).is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &Ctx<'a>, builder: &mut SnapshotBuilder) -> Result<(), MergeConflict> {
        if self == Self::Delete {
            builder.remove_database(ctx.changed.identifier());
        }
        Ok(())
    }
}
