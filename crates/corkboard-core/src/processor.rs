//! Relationship lifecycle orchestration.
//!
//! One place drives every transition, in a fixed and auditable order:
//! validate, persist the status change, move tags, fix counts, notify the
//! discussion topic. There are no implicit lifecycle hooks; each operation
//! is an explicit function taking the acting user.
//!
//! Approval is the involved one:
//!
//! 1. authorization precondition ([`Authorizer::can_approve`])
//! 2. graph re-validation (the graph may have changed since creation —
//!    the losing side of a race gets a validation error here)
//! 3. `pending → queued` (the exclusive gate: only one caller can win it)
//! 4. `queued → processing`, then the streaming move under the bounded
//!    retry policy — each attempt takes the per-relationship advisory lock
//!    and releases it before any backoff sleep
//! 5. on success `processing → active`, counts recomputed, topic notified
//! 6. on exhaustion or a fatal error the relationship is parked in
//!    `error(reason)` for operator attention (`retry` or `undo`)

use crate::config::EngineConfig;
use crate::error::ErrorCode;
use crate::graph::{RelationGraph, ValidationError, Validator};
use crate::lock::{LockError, ProcessingLock};
use crate::model::{RelationKind, RelationStatus, Relationship, TagName, TransitionError};
use crate::mover::{self, MoveOutcome, UndoOutcome};
use crate::retry::{RetryOutcome, RetryPolicy, run_with_retry};
use crate::store::{Authorizer, EngineStore, NewRelationship, StoreError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Failure of a processor operation.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("'{actor}' is not allowed to {action} this relationship")]
    PermissionDenied { actor: String, action: &'static str },

    #[error("relationship #{0} not found")]
    NotFound(i64),

    #[error("relationship #{0} has no undo data; only applied relationships can be undone")]
    NothingToUndo(i64),

    /// The apply pass failed; the relationship is parked in `error`.
    #[error("apply failed: {reason}")]
    ApplyFailed { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProcessError {
    /// Machine-readable code for logs and operator output.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code(),
            Self::Transition(_) => ErrorCode::InvalidStateTransition,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::NotFound(_) => ErrorCode::RelationshipNotFound,
            Self::NothingToUndo(_) => ErrorCode::UndoDataMissing,
            Self::ApplyFailed { .. } => ErrorCode::RetriesExhausted,
            Self::Store(err) => err.error_code(),
        }
    }
}

/// One apply attempt's failure: mover error or lock contention.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Lock(LockError::Timeout { .. }) => true,
            Self::Lock(LockError::IoError(_)) => false,
        }
    }
}

/// The relationship processor. One instance is cheap and reusable; all
/// state lives in the store.
pub struct Processor {
    policy: RetryPolicy,
    batch_size: usize,
    /// When set, each apply attempt holds an advisory lock file under this
    /// directory, keyed by relationship id.
    lock_dir: Option<PathBuf>,
    lock_timeout: Duration,
    update_topics: bool,
    sleep: fn(Duration),
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            batch_size: mover::DEFAULT_BATCH_SIZE,
            lock_dir: None,
            lock_timeout: Duration::from_secs(5),
            update_topics: true,
            sleep: std::thread::sleep,
        }
    }
}

impl Processor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            policy: config.retry.policy(),
            batch_size: config.mover.batch_size,
            update_topics: config.forum.update_topics,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_lock_dir(mut self, dir: PathBuf) -> Self {
        self.lock_dir = Some(dir);
        self
    }

    #[must_use]
    pub const fn with_update_topics(mut self, update_topics: bool) -> Self {
        self.update_topics = update_topics;
        self
    }

    /// Replace the backoff sleeper (tests use a no-op).
    #[must_use]
    pub fn with_sleeper(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Create a proposal in `pending`, gated by graph validation, and
    /// attach a discussion topic unless `skip_forum`.
    ///
    /// # Errors
    ///
    /// [`ProcessError::Validation`] when the proposal conflicts with the
    /// live graph; store errors are passed through.
    pub fn create<S: EngineStore>(
        &self,
        store: &mut S,
        kind: RelationKind,
        antecedent: TagName,
        consequent: TagName,
        creator: &str,
        skip_forum: bool,
    ) -> Result<Relationship, ProcessError> {
        let all = store.all_relationships()?;
        Validator::validate_new(kind, &antecedent, &consequent, &all)?;

        let mut rel = store.insert_relationship(&NewRelationship {
            kind,
            antecedent,
            consequent,
            creator: creator.to_string(),
        })?;

        if !skip_forum {
            let title = topic_title(&rel, None);
            let body = format!(
                "The {} has been proposed by {}. Discuss it here.",
                rel.describe(),
                creator
            );
            let topic_id = store.create_topic(&title, &body)?;
            rel.topic_id = Some(topic_id);
            store.update_relationship(&rel)?;
        }

        info!(relationship_id = rel.id, kind = %rel.kind, %creator, "proposal created");
        Ok(rel)
    }

    /// Approve a pending proposal and apply it to the corpus.
    ///
    /// # Errors
    ///
    /// Authorization, transition, and re-validation failures are returned
    /// before anything is persisted. [`ProcessError::ApplyFailed`] means
    /// the relationship is now parked in `error(reason)`.
    pub fn approve<S: EngineStore>(
        &self,
        store: &mut S,
        auth: &dyn Authorizer,
        id: i64,
        actor: &str,
    ) -> Result<MoveOutcome, ProcessError> {
        let mut rel = fetch(store, id)?;

        if !auth.can_approve(actor, &rel) {
            return Err(ProcessError::PermissionDenied {
                actor: actor.to_string(),
                action: "approve",
            });
        }
        if rel.status != RelationStatus::Pending {
            return Err(TransitionError {
                from: rel.status,
                to: RelationStatus::Queued,
            }
            .into());
        }

        // The graph may have changed since creation; the second of two
        // conflicting approvals dies here with a validation error.
        let all = store.all_relationships()?;
        Validator::validate_approval(&rel, &all)?;

        rel.approver = Some(actor.to_string());
        set_status(store, &mut rel, RelationStatus::Queued)?;

        // A fresh apply replaces any stale log from a previous life.
        store.clear_undo_entries(rel.id)?;

        self.process(store, &mut rel, actor)
    }

    /// Re-run the apply for an `error`-parked relationship.
    ///
    /// The undo log is kept: edits recorded by the failed pass are not
    /// re-applied, only the remaining posts are moved.
    ///
    /// # Errors
    ///
    /// As for [`Self::approve`].
    pub fn retry<S: EngineStore>(
        &self,
        store: &mut S,
        auth: &dyn Authorizer,
        id: i64,
        actor: &str,
    ) -> Result<MoveOutcome, ProcessError> {
        let mut rel = fetch(store, id)?;

        if !auth.can_approve(actor, &rel) {
            return Err(ProcessError::PermissionDenied {
                actor: actor.to_string(),
                action: "retry",
            });
        }
        if !matches!(rel.status, RelationStatus::Error(_)) {
            return Err(TransitionError {
                from: rel.status,
                to: RelationStatus::Queued,
            }
            .into());
        }

        let all = store.all_relationships()?;
        Validator::validate_approval(&rel, &all)?;

        set_status(store, &mut rel, RelationStatus::Queued)?;
        self.process(store, &mut rel, actor)
    }

    /// Reject a proposal: any non-terminal, non-active status → `deleted`.
    ///
    /// # Errors
    ///
    /// [`ProcessError::Transition`] when the relationship is already
    /// active, retired, or deleted.
    pub fn reject<S: EngineStore>(
        &self,
        store: &mut S,
        auth: &dyn Authorizer,
        id: i64,
        actor: &str,
    ) -> Result<(), ProcessError> {
        let mut rel = fetch(store, id)?;

        if !auth.can_reject(actor, &rel) {
            return Err(ProcessError::PermissionDenied {
                actor: actor.to_string(),
                action: "reject",
            });
        }

        set_status(store, &mut rel, RelationStatus::Deleted)?;

        if self.update_topics {
            let body = format!("The {} has been rejected by {}.", rel.describe(), actor);
            self.notify(store, &mut rel, "REJECTED", &body)?;
        }

        info!(relationship_id = rel.id, %actor, "proposal rejected");
        Ok(())
    }

    /// Reverse an applied relationship: `active`/`error` → `retired`, then
    /// replay the undo log. Safe to re-run after a partial undo; a second
    /// call on a fully consumed log is a no-op.
    ///
    /// # Errors
    ///
    /// [`ProcessError::NothingToUndo`] when nothing was ever applied;
    /// transition errors for statuses with nothing to reverse.
    pub fn undo<S: EngineStore>(
        &self,
        store: &mut S,
        auth: &dyn Authorizer,
        id: i64,
        actor: &str,
    ) -> Result<UndoOutcome, ProcessError> {
        let mut rel = fetch(store, id)?;

        if !auth.can_approve(actor, &rel) {
            return Err(ProcessError::PermissionDenied {
                actor: actor.to_string(),
                action: "undo",
            });
        }

        let mut announced = false;
        match rel.status {
            RelationStatus::Active | RelationStatus::Error(_) => {
                if store.load_undo_entries(id)?.is_empty() {
                    return Err(ProcessError::NothingToUndo(id));
                }
                set_status(store, &mut rel, RelationStatus::Retired)?;
                announced = true;
            }
            // Resuming a partial undo, or a no-op re-run.
            RelationStatus::Retired => {}
            ref other => {
                return Err(TransitionError {
                    from: other.clone(),
                    to: RelationStatus::Retired,
                }
                .into());
            }
        }

        let outcome = mover::undo_move(store, id, &rel.antecedent, &rel.consequent, actor)?;

        if announced && self.update_topics {
            let body = format!(
                "The {} has been undone by {}. {} posts restored.",
                rel.describe(),
                actor,
                outcome.reverted
            );
            self.notify(store, &mut rel, "RETIRED", &body)?;
        }

        info!(relationship_id = id, reverted = outcome.reverted, "undo complete");
        Ok(outcome)
    }

    /// Drive `queued → processing → active | error`, applying the move
    /// under the retry policy.
    fn process<S: EngineStore>(
        &self,
        store: &mut S,
        rel: &mut Relationship,
        actor: &str,
    ) -> Result<MoveOutcome, ProcessError> {
        set_status(store, rel, RelationStatus::Processing)?;

        let targets = self.resolve_targets(store, rel)?;

        let result = run_with_retry(
            self.policy,
            |_attempt| -> Result<MoveOutcome, AttemptError> {
                // The advisory lock is per attempt: nothing is held across
                // a backoff sleep.
                let _lock = match &self.lock_dir {
                    Some(dir) => Some(ProcessingLock::acquire(dir, rel.id, self.lock_timeout)?),
                    None => None,
                };
                Ok(mover::move_tag(
                    store,
                    rel.id,
                    rel.kind,
                    &rel.antecedent,
                    &targets,
                    actor,
                    self.batch_size,
                )?)
            },
            AttemptError::is_transient,
            self.sleep,
        );

        match result {
            Ok(outcome) => {
                set_status(store, rel, RelationStatus::Active)?;
                if self.update_topics {
                    self.notify(
                        store,
                        rel,
                        "APPROVED",
                        &format!(
                            "The {} has been approved. {} posts updated, {} skipped; '{}' now has {} posts.",
                            rel.describe(),
                            outcome.updated,
                            outcome.skipped,
                            targets[0],
                            outcome.consequent_post_count
                        ),
                    )?;
                }
                Ok(outcome)
            }
            Err(outcome) => {
                let reason = match outcome {
                    RetryOutcome::Fatal(err) => err.to_string(),
                    RetryOutcome::Exhausted { attempts, last } => {
                        format!("{last} (gave up after {attempts} attempts)")
                    }
                };
                error!(relationship_id = rel.id, %reason, "apply failed, parking in error state");

                set_status(store, rel, RelationStatus::Error(reason.clone()))?;
                if self.update_topics {
                    self.notify(
                        store,
                        rel,
                        "FAILED",
                        &format!("The {} failed during processing: {reason}", rel.describe()),
                    )?;
                }
                Err(ProcessError::ApplyFailed { reason })
            }
        }
    }

    /// The tag list the mover writes: for an alias, the chain-resolved
    /// consequent; for an implication, the consequent plus its active
    /// transitive closure.
    fn resolve_targets<S: EngineStore>(
        &self,
        store: &mut S,
        rel: &Relationship,
    ) -> Result<Vec<TagName>, ProcessError> {
        let all = store.all_relationships()?;
        let graph = RelationGraph::build(&all, Some(rel.id));

        Ok(match rel.kind {
            RelationKind::Alias => {
                let target = graph.resolve_alias_target(&rel.consequent);
                if target != rel.consequent {
                    info!(
                        relationship_id = rel.id,
                        requested = %rel.consequent,
                        resolved = %target,
                        "consequent is itself aliased; moving to the end of the chain"
                    );
                }
                vec![target]
            }
            RelationKind::Implication => graph.implication_targets(&rel.consequent),
        })
    }

    /// Post a status message to the relationship's topic and retitle it.
    fn notify<S: EngineStore>(
        &self,
        store: &mut S,
        rel: &mut Relationship,
        state_word: &str,
        body: &str,
    ) -> Result<(), ProcessError> {
        let Some(topic_id) = rel.topic_id else {
            return Ok(());
        };
        let post_id = store.post_message(topic_id, body)?;
        store.update_topic_title(topic_id, &topic_title(rel, Some(state_word)))?;
        rel.forum_post_id = Some(post_id);
        store.update_relationship(rel)?;
        Ok(())
    }
}

/// Canonical topic title, optionally prefixed with the lifecycle outcome.
fn topic_title(rel: &Relationship, state_word: Option<&str>) -> String {
    let base = format!(
        "{}: {} -> {}",
        rel.kind.label(),
        rel.antecedent,
        rel.consequent
    );
    match state_word {
        Some(word) => format!("[{word}] {base}"),
        None => base,
    }
}

fn fetch<S: EngineStore>(store: &S, id: i64) -> Result<Relationship, ProcessError> {
    store
        .get_relationship(id)?
        .ok_or(ProcessError::NotFound(id))
}

/// Check the lifecycle table, persist, and log one status change.
fn set_status<S: EngineStore>(
    store: &mut S,
    rel: &mut Relationship,
    status: RelationStatus,
) -> Result<(), ProcessError> {
    rel.status.can_transition_to(&status)?;
    info!(relationship_id = rel.id, from = %rel.status, to = %status, "status change");
    rel.status = status;
    store.update_relationship(rel)?;
    Ok(())
}
