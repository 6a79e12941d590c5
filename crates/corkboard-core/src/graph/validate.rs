//! Graph-consistency validation for new and about-to-be-approved
//! relationships.
//!
//! Validation runs twice in a relationship's life: once at creation and
//! again at approval, because the graph may have changed in between (two
//! conflicting proposals can both sit in `pending`, and only the first
//! approval may win).

use crate::error::ErrorCode;
use crate::graph::RelationGraph;
use crate::model::{RelationKind, RelationStatus, Relationship, TagName};

/// A graph-conflict rejection. User-correctable, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("cannot alias tag '{tag}' to itself")]
    SelfAlias { tag: TagName },

    #[error("cannot imply tag '{tag}' from itself")]
    SelfImplication { tag: TagName },

    #[error("'{antecedent}' is already aliased to '{existing_consequent}'")]
    DuplicateAntecedent {
        antecedent: TagName,
        existing_consequent: TagName,
    },

    #[error("circular relation: {}", format_path(.path))]
    CircularRelation { path: Vec<TagName> },

    #[error("'{antecedent}' already implies '{consequent}' through another implication")]
    RedundantImplication {
        antecedent: TagName,
        consequent: TagName,
    },
}

impl ValidationError {
    /// Machine-readable code associated with this rejection.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SelfAlias { .. } | Self::SelfImplication { .. } => ErrorCode::SelfRelation,
            Self::DuplicateAntecedent { .. } => ErrorCode::DuplicateAntecedent,
            Self::CircularRelation { .. } => ErrorCode::CircularRelation,
            Self::RedundantImplication { .. } => ErrorCode::RedundantImplication,
        }
    }
}

fn format_path(path: &[TagName]) -> String {
    path.iter()
        .map(TagName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Stateless validator over a snapshot of the relationship set.
pub struct Validator;

impl Validator {
    /// Gate creation of a brand-new proposal.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ValidationError`].
    pub fn validate_new(
        kind: RelationKind,
        antecedent: &TagName,
        consequent: &TagName,
        relationships: &[Relationship],
    ) -> Result<(), ValidationError> {
        Self::validate(kind, antecedent, consequent, relationships, None)
    }

    /// Re-gate an existing row at approval time, excluding the row itself
    /// from the graph so it does not conflict with its own edge.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ValidationError`].
    pub fn validate_approval(
        rel: &Relationship,
        relationships: &[Relationship],
    ) -> Result<(), ValidationError> {
        Self::validate(
            rel.kind,
            &rel.antecedent,
            &rel.consequent,
            relationships,
            Some(rel.id),
        )
    }

    fn validate(
        kind: RelationKind,
        antecedent: &TagName,
        consequent: &TagName,
        relationships: &[Relationship],
        exclude_id: Option<i64>,
    ) -> Result<(), ValidationError> {
        if antecedent == consequent {
            return Err(match kind {
                RelationKind::Alias => ValidationError::SelfAlias {
                    tag: antecedent.clone(),
                },
                RelationKind::Implication => ValidationError::SelfImplication {
                    tag: antecedent.clone(),
                },
            });
        }

        let graph = RelationGraph::build(relationships, exclude_id);

        match kind {
            RelationKind::Alias => {
                Self::check_duplicate_antecedent(antecedent, relationships, exclude_id)?;
                if let Some(path) = graph.alias_cycle(antecedent, consequent) {
                    return Err(ValidationError::CircularRelation { path });
                }
            }
            RelationKind::Implication => {
                if let Some(path) = graph.implication_cycle(antecedent, consequent) {
                    return Err(ValidationError::CircularRelation { path });
                }
                if graph.already_implies(antecedent, consequent) {
                    return Err(ValidationError::RedundantImplication {
                        antecedent: antecedent.clone(),
                        consequent: consequent.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// An antecedent may carry at most one alias at a time. Live rows and
    /// error-parked rows block (an operator can retry an error row back to
    /// live); deleted and retired rows do not, otherwise an undone alias
    /// could never be recreated.
    fn check_duplicate_antecedent(
        antecedent: &TagName,
        relationships: &[Relationship],
        exclude_id: Option<i64>,
    ) -> Result<(), ValidationError> {
        let conflict = relationships.iter().find(|rel| {
            Some(rel.id) != exclude_id
                && rel.kind == RelationKind::Alias
                && rel.antecedent == *antecedent
                && (rel.status.is_live() || matches!(rel.status, RelationStatus::Error(_)))
        });

        match conflict {
            Some(existing) => Err(ValidationError::DuplicateAntecedent {
                antecedent: antecedent.clone(),
                existing_consequent: existing.consequent.clone(),
            }),
            None => Ok(()),
        }
    }
}
