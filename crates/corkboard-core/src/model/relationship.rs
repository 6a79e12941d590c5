//! Tag relationship records and their lifecycle state machine.
//!
//! A relationship is either an **alias** (`antecedent` is renamed into
//! `consequent` on every post) or an **implication** (`antecedent` drags
//! `consequent` onto every post). Both share one record shape and one
//! state machine; kind-specific behavior dispatches on [`RelationKind`].
//!
//! # Lifecycle
//!
//! ```text
//! pending ──approve──▶ queued ──▶ processing ──▶ active ──undo──▶ retired
//!    │                   │            │  │
//!    │                   │            │  └────────▶ error ──retry──▶ queued
//!    └──reject──▶ deleted ◀───────────┘                 └──undo───▶ retired
//! ```
//!
//! `deleted` and `retired` are terminal. A retired relationship cannot
//! return to active; it must be recreated.

use crate::model::tag_name::TagName;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The two kinds of tag relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Alias,
    Implication,
}

impl RelationKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Implication => "implication",
        }
    }

    /// Human phrasing used in forum topic titles and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Alias => "Tag alias",
            Self::Implication => "Tag implication",
        }
    }
}

/// Lifecycle status of a relationship.
///
/// `Error` carries the summary of the failure that parked the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "reason")]
pub enum RelationStatus {
    Pending,
    Queued,
    Processing,
    Active,
    Retired,
    Deleted,
    Error(String),
}

impl RelationStatus {
    /// Canonical status column value (the error reason is stored apart).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Active => "active",
            Self::Retired => "retired",
            Self::Deleted => "deleted",
            Self::Error(_) => "error",
        }
    }

    /// Reassemble a status from its column value and optional error reason.
    ///
    /// # Errors
    ///
    /// Returns [`ParseStatusError`] for unknown column values.
    pub fn from_parts(status: &str, error_reason: Option<String>) -> Result<Self, ParseStatusError> {
        match status {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "active" => Ok(Self::Active),
            "retired" => Ok(Self::Retired),
            "deleted" => Ok(Self::Deleted),
            "error" => Ok(Self::Error(error_reason.unwrap_or_default())),
            _ => Err(ParseStatusError {
                got: status.to_string(),
            }),
        }
    }

    /// Whether this status contributes edges to the validation graph view.
    ///
    /// Pending proposals count: two pending proposals can conflict with
    /// each other before either is approved.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Queued | Self::Processing | Self::Active
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Retired | Self::Deleted)
    }

    /// Validate whether a transition from `self` to `target` is allowed.
    ///
    /// Violations are ordering bugs in the caller, not user-facing
    /// validation failures.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] identifying the current and requested
    /// states when the transition is not in the lifecycle table.
    pub fn can_transition_to(&self, target: &Self) -> Result<(), TransitionError> {
        let allowed = matches!(
            (self, target),
            (Self::Pending, Self::Queued | Self::Deleted)
                | (Self::Queued, Self::Processing | Self::Deleted | Self::Error(_))
                | (
                    Self::Processing,
                    Self::Active | Self::Deleted | Self::Error(_)
                )
                | (
                    Self::Error(_),
                    Self::Queued | Self::Retired | Self::Deleted
                )
                | (Self::Active, Self::Retired)
        );

        if allowed {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.clone(),
                to: target.clone(),
            })
        }
    }
}

/// Error returned when a lifecycle transition is requested from the wrong
/// source state. Treated as a bug report, never silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: RelationStatus,
    pub to: RelationStatus,
}

/// Error returned when parsing a status column value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid relationship status: '{got}'")]
pub struct ParseStatusError {
    pub got: String,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(reason) if !reason.is_empty() => write!(f, "error: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for RelationKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alias" => Ok(Self::Alias),
            "implication" | "imply" => Ok(Self::Implication),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}

/// A persisted tag relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub kind: RelationKind,
    pub antecedent: TagName,
    pub consequent: TagName,
    pub status: RelationStatus,
    pub creator: String,
    pub approver: Option<String>,
    /// Forum topic attached at creation for discussion of the proposal.
    pub topic_id: Option<i64>,
    /// Forum post seeding that topic.
    pub forum_post_id: Option<i64>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Relationship {
    /// Short human description, e.g. `tag alias long_hair -> longhair`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("tag {} {} -> {}", self.kind, self.antecedent, self.consequent)
    }
}

#[cfg(test)]
mod tests {
    use super::{RelationKind, RelationStatus, TransitionError};
    use std::str::FromStr;

    fn err(reason: &str) -> RelationStatus {
        RelationStatus::Error(reason.to_string())
    }

    #[test]
    fn happy_path_transitions() {
        assert!(
            RelationStatus::Pending
                .can_transition_to(&RelationStatus::Queued)
                .is_ok()
        );
        assert!(
            RelationStatus::Queued
                .can_transition_to(&RelationStatus::Processing)
                .is_ok()
        );
        assert!(
            RelationStatus::Processing
                .can_transition_to(&RelationStatus::Active)
                .is_ok()
        );
        assert!(
            RelationStatus::Active
                .can_transition_to(&RelationStatus::Retired)
                .is_ok()
        );
    }

    #[test]
    fn error_parking_and_recovery() {
        assert!(
            RelationStatus::Processing
                .can_transition_to(&err("boom"))
                .is_ok()
        );
        assert!(err("boom").can_transition_to(&RelationStatus::Queued).is_ok());
        assert!(
            err("boom")
                .can_transition_to(&RelationStatus::Retired)
                .is_ok()
        );
        assert!(
            err("boom")
                .can_transition_to(&RelationStatus::Deleted)
                .is_ok()
        );
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for target in [
            RelationStatus::Pending,
            RelationStatus::Queued,
            RelationStatus::Processing,
            RelationStatus::Active,
            err("x"),
        ] {
            assert!(matches!(
                RelationStatus::Deleted.can_transition_to(&target),
                Err(TransitionError { .. })
            ));
            assert!(matches!(
                RelationStatus::Retired.can_transition_to(&target),
                Err(TransitionError { .. })
            ));
        }
    }

    #[test]
    fn deleted_cannot_be_approved() {
        assert!(
            RelationStatus::Deleted
                .can_transition_to(&RelationStatus::Queued)
                .is_err()
        );
    }

    #[test]
    fn active_cannot_be_deleted() {
        // Applied relationships are undone, not rejected.
        assert!(
            RelationStatus::Active
                .can_transition_to(&RelationStatus::Deleted)
                .is_err()
        );
    }

    #[test]
    fn live_statuses() {
        assert!(RelationStatus::Pending.is_live());
        assert!(RelationStatus::Queued.is_live());
        assert!(RelationStatus::Processing.is_live());
        assert!(RelationStatus::Active.is_live());
        assert!(!err("x").is_live());
        assert!(!RelationStatus::Retired.is_live());
        assert!(!RelationStatus::Deleted.is_live());
    }

    #[test]
    fn status_column_roundtrip() {
        for status in [
            RelationStatus::Pending,
            RelationStatus::Queued,
            RelationStatus::Processing,
            RelationStatus::Active,
            RelationStatus::Retired,
            RelationStatus::Deleted,
        ] {
            let back = RelationStatus::from_parts(status.as_str(), None).unwrap();
            assert_eq!(back, status);
        }

        let parked = RelationStatus::from_parts("error", Some("lock timeout".into())).unwrap();
        assert_eq!(parked, err("lock timeout"));
        assert_eq!(parked.to_string(), "error: lock timeout");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(RelationStatus::from_parts("approved", None).is_err());
    }

    #[test]
    fn kind_parses_human_spellings() {
        assert_eq!(RelationKind::from_str("alias").unwrap(), RelationKind::Alias);
        assert_eq!(
            RelationKind::from_str("imply").unwrap(),
            RelationKind::Implication
        );
        assert_eq!(
            RelationKind::from_str("Implication").unwrap(),
            RelationKind::Implication
        );
        assert!(RelationKind::from_str("rename").is_err());
    }
}
