//! Streaming bulk tag moves across the post corpus.
//!
//! A move rewrites every post carrying the antecedent tag: an alias
//! replaces it with the consequent (collapsing duplicates), an implication
//! adds the consequent — and everything the consequent transitively
//! requires — alongside it. Posts are streamed in ascending id batches:
//! the corpus is large and concurrently edited, so the pass never loads it
//! into memory and never holds more than one post's lock at a time.
//!
//! Every edit is appended to the relationship's durable undo log *as it is
//! made*, which is what makes the pass resumable: a retried move streams
//! the remaining matches (an already-moved alias post no longer carries
//! the antecedent and never matches again; an already-moved implication
//! post carries every target and is left untouched) and keeps appending to
//! the same log.
//!
//! A single post failing mid-stream (deleted concurrently, corrupt row) is
//! skipped and counted, not fatal; store-level contention aborts the pass
//! with a transient error for the retry policy upstream.

use crate::model::{RelationKind, TagName};
use crate::store::{PostStore, RelationshipStore, StoreError, TagCountStore};
use crate::undo::UndoEntry;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Default number of post ids fetched per streaming batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What one move pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Posts whose tag set changed.
    pub updated: u64,
    /// Posts that matched the stream but could not be edited.
    pub skipped: u64,
    /// Fresh cached count of the antecedent after the pass.
    pub antecedent_post_count: i64,
    /// Fresh cached count of the primary consequent after the pass.
    pub consequent_post_count: i64,
}

/// What one undo pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Entries whose reversal changed a post.
    pub reverted: u64,
    /// Entries consumed without effect (post gone or independently edited).
    pub skipped: u64,
}

/// Move `antecedent` into `targets` on every matching post, recording each
/// edit in relationship `relationship_id`'s undo log.
///
/// For an alias, `targets` is the single (chain-resolved) consequent; for
/// an implication it is the consequent followed by its active transitive
/// closure. The first element is the primary consequent either way.
///
/// Idempotent per post: a post that already carries every target (and, for
/// an alias, lacks the antecedent) is never touched again.
///
/// # Errors
///
/// Returns the first store-level error that is not a per-post skip; the
/// caller classifies it as transient or fatal.
pub fn move_tag<S>(
    store: &mut S,
    relationship_id: i64,
    kind: RelationKind,
    antecedent: &TagName,
    targets: &[TagName],
    actor: &str,
    batch_size: usize,
) -> Result<MoveOutcome, StoreError>
where
    S: PostStore + RelationshipStore + TagCountStore,
{
    let primary = targets
        .first()
        .ok_or_else(|| StoreError::Corrupt("move with no target tag".into()))?;
    let batch_size = batch_size.max(1);
    let mut updated = 0_u64;
    let mut skipped = 0_u64;
    let mut cursor = 0_i64;

    info!(
        relationship_id,
        %antecedent,
        consequent = %primary,
        kind = %kind,
        "starting tag move"
    );

    loop {
        let ids = store.posts_with_tag_after(antecedent, cursor, batch_size)?;
        let Some(&last) = ids.last() else {
            break;
        };
        cursor = last;

        for id in ids {
            let mut entries: Vec<UndoEntry> = Vec::new();
            let result = store.update_post_tags(id, actor, true, &mut |tags| {
                entries = apply_move(id, kind, antecedent, targets, tags);
            });

            match result {
                Ok(true) => {
                    store.append_undo_entries(relationship_id, &entries)?;
                    updated += 1;
                }
                Ok(false) => {
                    // Raced: the post stopped matching between the stream
                    // and the lock. Nothing to record.
                    debug!(post_id = id, "post no longer matches, nothing to do");
                }
                Err(
                    err @ (StoreError::PostNotFound(_)
                    | StoreError::PostDeleted(_)
                    | StoreError::Corrupt(_)),
                ) => {
                    skipped += 1;
                    warn!(post_id = id, error = %err, "skipping post mid-move");
                }
                Err(err) => return Err(err),
            }
        }
    }

    // Counts are recomputed from authoritative membership, never
    // incremented speculatively, so they converge even after a partial
    // pass.
    let antecedent_post_count = store.recompute_post_count(antecedent)?;
    let mut consequent_post_count = 0;
    for target in targets {
        let count = store.recompute_post_count(target)?;
        if target == primary {
            consequent_post_count = count;
        }
    }

    info!(
        relationship_id,
        updated, skipped, antecedent_post_count, consequent_post_count, "tag move finished"
    );

    Ok(MoveOutcome {
        updated,
        skipped,
        antecedent_post_count,
        consequent_post_count,
    })
}

/// Mutate one post's tag set for the move; returns the undo records for
/// the edits made.
fn apply_move(
    post_id: i64,
    kind: RelationKind,
    antecedent: &TagName,
    targets: &[TagName],
    tags: &mut BTreeSet<TagName>,
) -> Vec<UndoEntry> {
    if !tags.contains(antecedent) {
        return Vec::new();
    }

    match kind {
        RelationKind::Alias => {
            let Some(target) = targets.first() else {
                return Vec::new();
            };
            let had_consequent = tags.contains(target);
            tags.remove(antecedent);
            tags.insert(target.clone());
            vec![UndoEntry {
                post_id,
                removed: Some(antecedent.clone()),
                added: (!had_consequent).then(|| target.clone()),
            }]
        }
        RelationKind::Implication => targets
            .iter()
            .filter(|target| tags.insert((*target).clone()))
            .map(|target| UndoEntry {
                post_id,
                removed: None,
                added: Some(target.clone()),
            })
            .collect(),
    }
}

/// Replay relationship `relationship_id`'s undo log in reverse, consuming
/// each entry as its reversal commits.
///
/// Best-effort by contract: entries whose guard no longer holds (the post
/// was independently edited, or no longer exists) are consumed without
/// touching the post. Re-running on a fully consumed log is a no-op.
///
/// # Errors
///
/// Returns store-level errors other than per-post skips; a transient
/// failure leaves the remaining log intact for a later re-run.
pub fn undo_move<S>(
    store: &mut S,
    relationship_id: i64,
    antecedent: &TagName,
    consequent: &TagName,
    actor: &str,
) -> Result<UndoOutcome, StoreError>
where
    S: PostStore + RelationshipStore + TagCountStore,
{
    let entries = store.load_undo_entries(relationship_id)?;
    let mut reverted = 0_u64;
    let mut skipped = 0_u64;

    // Every tag the reversals can touch needs its count fixed afterward.
    let mut touched: BTreeSet<TagName> =
        BTreeSet::from([antecedent.clone(), consequent.clone()]);
    for (_, entry) in &entries {
        touched.extend(entry.removed.iter().cloned());
        touched.extend(entry.added.iter().cloned());
    }

    for (seq, entry) in entries.into_iter().rev() {
        let mut changed_any = false;
        let result = store.update_post_tags(entry.post_id, actor, true, &mut |tags| {
            changed_any = entry.reverse_onto(tags);
        });

        match result {
            Ok(_) => {
                if changed_any {
                    reverted += 1;
                } else {
                    skipped += 1;
                }
            }
            Err(
                err @ (StoreError::PostNotFound(_)
                | StoreError::PostDeleted(_)
                | StoreError::Corrupt(_)),
            ) => {
                skipped += 1;
                warn!(post_id = entry.post_id, error = %err, "skipping vanished post during undo");
            }
            Err(err) => return Err(err),
        }

        store.consume_undo_entry(relationship_id, seq)?;
    }

    for tag in &touched {
        store.recompute_post_count(tag)?;
    }

    info!(relationship_id, reverted, skipped, "undo pass finished");

    Ok(UndoOutcome { reverted, skipped })
}
