//! Narrow service seams between the engine and its collaborators.
//!
//! The engine never talks to posts, tag counts, the forum, or relationship
//! rows directly; it goes through these traits. The production
//! implementation is the SQLite store in [`crate::db`]; an in-memory,
//! fault-injectable implementation lives in [`memory`] for unit tests.
//!
//! The traits are deliberately small: they are the whole contract with
//! subsystems this crate does not own (the post corpus, the discussion
//! forum, the authorization policy).

pub mod memory;

use crate::error::ErrorCode;
use crate::model::{Post, RelationKind, Relationship, TagName};
use crate::undo::UndoEntry;
use std::collections::BTreeSet;

/// Store-level failure, classified so the retry policy can tell transient
/// contention from real breakage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer holds the store; safe to retry after backoff.
    #[error("store busy: {0}")]
    Busy(String),

    #[error("post #{0} not found")]
    PostNotFound(i64),

    #[error("post #{0} is deleted")]
    PostDeleted(i64),

    #[error("relationship #{0} not found")]
    RelationshipNotFound(i64),

    #[error("forum topic #{0} not found")]
    TopicNotFound(i64),

    /// A stored row failed to parse back into a model type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether retrying the whole operation after a backoff can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Busy(_) => true,
            Self::Sql(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Machine-readable code for logs and operator output.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Busy(_) => ErrorCode::StoreBusy,
            Self::PostNotFound(_) | Self::PostDeleted(_) => ErrorCode::PostVanished,
            Self::RelationshipNotFound(_) | Self::TopicNotFound(_) => {
                ErrorCode::RelationshipNotFound
            }
            Self::Corrupt(_) | Self::Sql(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Fields for a relationship row about to be created.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub kind: RelationKind,
    pub antecedent: TagName,
    pub consequent: TagName,
    pub creator: String,
}

/// Access to the post corpus. Posts are owned elsewhere; the engine only
/// streams matches and performs guarded read-modify-write edits.
pub trait PostStore {
    /// Ids of non-deleted posts tagged `tag` with `id > after_id`, in
    /// ascending id order, at most `limit` of them. The ascending-id
    /// contract is what makes an interrupted move deterministic to resume.
    fn posts_with_tag_after(
        &self,
        tag: &TagName,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, StoreError>;

    fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Insert or replace a post row (seeding and tests).
    fn put_post(&mut self, post: &Post) -> Result<(), StoreError>;

    /// Read-modify-write one post's tag set under the store's per-post
    /// exclusive lock. `edit` runs exactly once, inside the critical
    /// section; the row is saved with `editor`/`automated` attribution
    /// only when the tag set actually changed. Returns whether it did.
    ///
    /// # Errors
    ///
    /// [`StoreError::PostNotFound`] / [`StoreError::PostDeleted`] when the
    /// post vanished since it was streamed; [`StoreError::Busy`] when the
    /// lock could not be taken.
    fn update_post_tags(
        &mut self,
        id: i64,
        editor: &str,
        automated: bool,
        edit: &mut dyn FnMut(&mut BTreeSet<TagName>),
    ) -> Result<bool, StoreError>;
}

/// The denormalized tag post-count cache.
pub trait TagCountStore {
    fn post_count(&self, tag: &TagName) -> Result<i64, StoreError>;

    /// Recompute the cached count from authoritative post membership and
    /// return the fresh value. Never incremented speculatively.
    fn recompute_post_count(&mut self, tag: &TagName) -> Result<i64, StoreError>;
}

/// The discussion forum each proposal is synchronized with.
pub trait Forum {
    fn create_topic(&mut self, title: &str, body: &str) -> Result<i64, StoreError>;

    fn post_message(&mut self, topic_id: i64, body: &str) -> Result<i64, StoreError>;

    fn update_topic_title(&mut self, topic_id: i64, title: &str) -> Result<(), StoreError>;
}

/// Persistence for relationship rows and their undo logs.
pub trait RelationshipStore {
    fn insert_relationship(&mut self, new: &NewRelationship) -> Result<Relationship, StoreError>;

    /// Persist every mutable field of `rel` (status, error reason,
    /// approver, forum links, updated_at).
    fn update_relationship(&mut self, rel: &Relationship) -> Result<(), StoreError>;

    fn get_relationship(&self, id: i64) -> Result<Option<Relationship>, StoreError>;

    /// Every relationship row, any status. Validation builds its graph
    /// view from this snapshot.
    fn all_relationships(&self) -> Result<Vec<Relationship>, StoreError>;

    /// Append edits to the undo log, in order. Only called while the
    /// relationship is processing.
    fn append_undo_entries(
        &mut self,
        relationship_id: i64,
        entries: &[UndoEntry],
    ) -> Result<(), StoreError>;

    /// The undo log in append order, with each entry's sequence number.
    fn load_undo_entries(
        &self,
        relationship_id: i64,
    ) -> Result<Vec<(i64, UndoEntry)>, StoreError>;

    /// Delete one reversed entry. Called only after the reversal committed.
    fn consume_undo_entry(&mut self, relationship_id: i64, seq: i64) -> Result<(), StoreError>;

    /// Drop any stale undo log before a fresh apply.
    fn clear_undo_entries(&mut self, relationship_id: i64) -> Result<(), StoreError>;
}

/// Everything the relationship processor needs, in one bound. Implemented
/// automatically by any type providing the four store seams.
pub trait EngineStore: RelationshipStore + PostStore + TagCountStore + Forum {}

impl<T: RelationshipStore + PostStore + TagCountStore + Forum> EngineStore for T {}

/// Authorization policy, consumed but not defined here. The engine calls
/// these as preconditions; DNP lists, lockouts, and user levels live with
/// the caller.
pub trait Authorizer {
    fn can_approve(&self, actor: &str, rel: &Relationship) -> bool;

    fn can_reject(&self, actor: &str, rel: &Relationship) -> bool;
}

/// Permissive policy for the CLI and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_approve(&self, _actor: &str, _rel: &Relationship) -> bool {
        true
    }

    fn can_reject(&self, _actor: &str, _rel: &Relationship) -> bool {
        true
    }
}
