//! merge::strategies::field
//!
//! Field and scalar strategies.

use crate::catalog::doc_part::{DocPart, Field, Scalar};
use crate::catalog::error::ElementKind;
use crate::merge::conflict::{ConflictReason, MergeConflict, StrategyId};
use crate::merge::strategy::{MergeContext, MergeStrategy};

type FieldCtx<'a> = MergeContext<'a, &'a DocPart, Field>;
type ScalarCtx<'a> = MergeContext<'a, &'a DocPart, Scalar>;

/// Strategies for added fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMergeStrategy {
    /// The column is committed for another (name, type).
    SameIdentifier,
    /// The (name, type) is committed under another column.
    SameName,
    New,
}

fn committed_field<'a>(ctx: &FieldCtx<'a>) -> Option<&'a Field> {
    ctx.committed_parent
        .and_then(|dp| dp.field_by_identifier(ctx.changed.identifier()))
}

fn committed_field_namesake<'a>(ctx: &FieldCtx<'a>) -> Option<&'a Field> {
    ctx.committed_parent
        .and_then(|dp| dp.field_by_name_and_type(ctx.changed.name(), ctx.changed.field_type()))
        .filter(|f| f.identifier() != ctx.changed.identifier() && !ctx.siblings.was_removed(f.identifier()))
}

impl<'a> MergeStrategy<'a> for FieldMergeStrategy {
    type Parent = &'a DocPart;
    type Changed = Field;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::SameIdentifier, Self::SameName];
    const DEFAULT: Self = Self::New;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::SameIdentifier => "field.same_identifier",
            Self::SameName => "field.same_name",
            Self::New => "field.new",
        })
    }

    fn applies(self, ctx: &FieldCtx<'a>) -> bool {
        match self {
            Self::SameIdentifier => committed_field(ctx)
                .is_some_and(|f| f.name() != ctx.changed.name() || f.field_type() != ctx.changed.field_type()),
            Self::SameName => committed_field_namesake(ctx).is_some(),
            Self::New => true,
        }
    }

    fn execute(self, ctx: &FieldCtx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::SameIdentifier => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameIdentifier {
                    kind: ElementKind::Field,
                    identifier: changed.identifier().to_string(),
                    existing: committed_field(ctx).map(ToString::to_string).unwrap_or_default(),
                    proposed: changed.to_string(),
                },
            )),
            Self::SameName => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameName {
                    kind: ElementKind::Field,
                    key: changed.to_string(),
                    existing: committed_field_namesake(ctx)
                        .map(|f| f.identifier().to_string())
                        .unwrap_or_default(),
                    proposed: changed.identifier().to_string(),
                },
            )),
            Self::New => {
                if doc_part.field_by_identifier(changed.identifier()).is_none() {
                    doc_part
                        .insert_field(changed.clone())
                        .map_err(|e| ctx.rejected(self.id(), e))?;
                }
                Ok(())
            }
        }
    }
}

/// Strategies for removed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRemoveStrategy {
    /// A doc part index of the overlay still has a column on the field.
    InUse,
    NotExistent,
    Delete,
}

impl<'a> MergeStrategy<'a> for FieldRemoveStrategy {
    type Parent = &'a DocPart;
    type Changed = Field;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::InUse, Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::InUse => "field.in_use",
            Self::NotExistent => "field.not_existent",
            Self::Delete => "field.delete",
        })
    }

    fn applies(self, ctx: &FieldCtx<'a>) -> bool {
        match self {
            Self::InUse => ctx
                .uncommitted_parent
                .doc_part_indexes()
                .any(|dpi| dpi.covers_column(ctx.changed.identifier())),
            Self::NotExistent => committed_field(ctx).is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &FieldCtx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        match self {
            Self::InUse => {
                let user = ctx
                    .uncommitted_parent
                    .doc_part_indexes()
                    .find(|dpi| dpi.covers_column(ctx.changed.identifier()))
                    .map(|dpi| dpi.identifier().to_string())
                    .unwrap_or_default();
                Err(ctx.conflict(
                    self.id(),
                    ConflictReason::FieldInUse {
                        field: ctx.changed.to_string(),
                        doc_part_index: user,
                    },
                ))
            }
            Self::NotExistent => Ok(()),
            Self::Delete => {
                doc_part.remove_field(ctx.changed.identifier());
                Ok(())
            }
        }
    }
}

/// Strategies for added scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarMergeStrategy {
    SameIdentifier,
    SameType,
    New,
}

fn committed_scalar<'a>(ctx: &ScalarCtx<'a>) -> Option<&'a Scalar> {
    ctx.committed_parent
        .and_then(|dp| dp.scalar_by_identifier(ctx.changed.identifier()))
}

fn committed_scalar_namesake<'a>(ctx: &ScalarCtx<'a>) -> Option<&'a Scalar> {
    ctx.committed_parent
        .and_then(|dp| dp.scalar_by_type(ctx.changed.field_type()))
        .filter(|s| s.identifier() != ctx.changed.identifier() && !ctx.siblings.was_removed(s.identifier()))
}

impl<'a> MergeStrategy<'a> for ScalarMergeStrategy {
    type Parent = &'a DocPart;
    type Changed = Scalar;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::SameIdentifier, Self::SameType];
    const DEFAULT: Self = Self::New;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::SameIdentifier => "scalar.same_identifier",
            Self::SameType => "scalar.same_type",
            Self::New => "scalar.new",
        })
    }

    fn applies(self, ctx: &ScalarCtx<'a>) -> bool {
        match self {
            Self::SameIdentifier => {
                committed_scalar(ctx).is_some_and(|s| s.field_type() != ctx.changed.field_type())
            }
            Self::SameType => committed_scalar_namesake(ctx).is_some(),
            Self::New => true,
        }
    }

    fn execute(self, ctx: &ScalarCtx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        let changed = ctx.changed;
        match self {
            Self::SameIdentifier => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameIdentifier {
                    kind: ElementKind::Scalar,
                    identifier: changed.identifier().to_string(),
                    existing: committed_scalar(ctx)
                        .map(|s| s.field_type().to_string())
                        .unwrap_or_default(),
                    proposed: changed.field_type().to_string(),
                },
            )),
            Self::SameType => Err(ctx.conflict(
                self.id(),
                ConflictReason::SameName {
                    kind: ElementKind::Scalar,
                    key: changed.field_type().to_string(),
                    existing: committed_scalar_namesake(ctx)
                        .map(|s| s.identifier().to_string())
                        .unwrap_or_default(),
                    proposed: changed.identifier().to_string(),
                },
            )),
            Self::New => {
                if doc_part.scalar_by_identifier(changed.identifier()).is_none() {
                    doc_part
                        .insert_scalar(changed.clone())
                        .map_err(|e| ctx.rejected(self.id(), e))?;
                }
                Ok(())
            }
        }
    }
}

/// Strategies for removed scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarRemoveStrategy {
    NotExistent,
    Delete,
}

impl<'a> MergeStrategy<'a> for ScalarRemoveStrategy {
    type Parent = &'a DocPart;
    type Changed = Scalar;
    type Target = DocPart;

    const CHECKS: &'static [Self] = &[Self::NotExistent];
    const DEFAULT: Self = Self::Delete;

    fn id(self) -> StrategyId {
        StrategyId::new(match self {
            Self::NotExistent => "scalar.not_existent",
            Self::Delete => "scalar.delete",
        })
    }

    fn applies(self, ctx: &ScalarCtx<'a>) -> bool {
        match self {
            Self::NotExistent => committed_scalar(ctx).is_none(),
            Self::Delete => true,
        }
    }

    fn execute(self, ctx: &ScalarCtx<'a>, doc_part: &mut DocPart) -> Result<(), MergeConflict> {
        if self == Self::Delete {
            doc_part.remove_scalar(ctx.changed.identifier());
        }
        Ok(())
    }
}
