//! In-memory store implementing every engine seam.
//!
//! Used by unit tests (and nothing else): it keeps the whole corpus in
//! `BTreeMap`s, supports deterministic fault injection for exercising the
//! retry path, and can make posts "vanish" mid-stream the way a concurrent
//! deletion would in production.

use crate::model::{Post, RelationStatus, Relationship, TagName};
use crate::store::{
    Forum, NewRelationship, PostStore, RelationshipStore, StoreError, TagCountStore,
};
use crate::undo::UndoEntry;
use std::collections::{BTreeMap, BTreeSet};

/// A forum topic with its messages, for assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTopic {
    pub title: String,
    pub messages: Vec<String>,
}

/// In-memory implementation of all store seams.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: BTreeMap<i64, Post>,
    /// Posts removed from under the stream: they still appear in
    /// `posts_with_tag_after` results but fail every access.
    vanished: BTreeMap<i64, Post>,
    tag_counts: BTreeMap<TagName, i64>,
    relationships: BTreeMap<i64, Relationship>,
    next_relationship_id: i64,
    undo_logs: BTreeMap<i64, Vec<(i64, UndoEntry)>>,
    next_undo_seq: i64,
    topics: BTreeMap<i64, MemoryTopic>,
    next_topic_id: i64,
    next_forum_post_id: i64,
    clock_us: i64,
    /// Countdown of post updates that fail with `Busy` before succeeding.
    busy_updates_remaining: u32,
    /// Posts whose next update fails with `Busy`, one-shot each.
    busy_once_posts: std::collections::HashSet<i64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_relationship_id: 1,
            next_undo_seq: 1,
            next_topic_id: 1,
            next_forum_post_id: 1,
            clock_us: 1_000_000,
            ..Self::default()
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock_us += 1;
        self.clock_us
    }

    /// Make the next `n` post updates fail with [`StoreError::Busy`].
    pub fn fail_next_post_updates(&mut self, n: u32) {
        self.busy_updates_remaining = n;
    }

    /// Make the next update of `post_id` fail with [`StoreError::Busy`],
    /// once. Lets a test break a streaming pass partway through.
    pub fn fail_once_for_post(&mut self, post_id: i64) {
        self.busy_once_posts.insert(post_id);
    }

    /// Simulate a concurrent deletion: the post keeps matching the stream
    /// but every read or write of it fails with `PostNotFound`.
    pub fn vanish_post(&mut self, id: i64) {
        if let Some(post) = self.posts.remove(&id) {
            self.vanished.insert(id, post);
        }
    }

    /// Inspect a forum topic (tests).
    #[must_use]
    pub fn topic(&self, topic_id: i64) -> Option<&MemoryTopic> {
        self.topics.get(&topic_id)
    }
}

impl PostStore for MemoryStore {
    fn posts_with_tag_after(
        &self,
        tag: &TagName,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, StoreError> {
        let live = self.posts.iter().filter(|(_, p)| !p.is_deleted);
        let ghosts = self.vanished.iter();

        let mut ids: Vec<i64> = live
            .chain(ghosts)
            .filter(|&(id, post)| *id > after_id && post.tags.contains(tag))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids.truncate(limit);
        Ok(ids)
    }

    fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(&id).cloned())
    }

    fn put_post(&mut self, post: &Post) -> Result<(), StoreError> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    fn update_post_tags(
        &mut self,
        id: i64,
        editor: &str,
        automated: bool,
        edit: &mut dyn FnMut(&mut BTreeSet<TagName>),
    ) -> Result<bool, StoreError> {
        if self.busy_updates_remaining > 0 {
            self.busy_updates_remaining -= 1;
            return Err(StoreError::Busy("injected contention".into()));
        }
        if self.busy_once_posts.remove(&id) {
            return Err(StoreError::Busy(format!("injected contention on post {id}")));
        }

        let Some(post) = self.posts.get_mut(&id) else {
            return Err(StoreError::PostNotFound(id));
        };
        if post.is_deleted {
            return Err(StoreError::PostDeleted(id));
        }

        let before = post.tags.clone();
        edit(&mut post.tags);
        let changed = post.tags != before;

        if changed {
            post.last_editor = Some(editor.to_string());
            post.last_edit_was_automated = automated;
        }
        Ok(changed)
    }
}

impl TagCountStore for MemoryStore {
    fn post_count(&self, tag: &TagName) -> Result<i64, StoreError> {
        Ok(self.tag_counts.get(tag).copied().unwrap_or(0))
    }

    fn recompute_post_count(&mut self, tag: &TagName) -> Result<i64, StoreError> {
        let count = i64::try_from(
            self.posts
                .values()
                .filter(|p| !p.is_deleted && p.tags.contains(tag))
                .count(),
        )
        .unwrap_or(i64::MAX);
        self.tag_counts.insert(tag.clone(), count);
        Ok(count)
    }
}

impl Forum for MemoryStore {
    fn create_topic(&mut self, title: &str, body: &str) -> Result<i64, StoreError> {
        let topic_id = self.next_topic_id;
        self.next_topic_id += 1;
        self.topics.insert(
            topic_id,
            MemoryTopic {
                title: title.to_string(),
                messages: vec![body.to_string()],
            },
        );
        Ok(topic_id)
    }

    fn post_message(&mut self, topic_id: i64, body: &str) -> Result<i64, StoreError> {
        let topic = self
            .topics
            .get_mut(&topic_id)
            .ok_or(StoreError::TopicNotFound(topic_id))?;
        topic.messages.push(body.to_string());
        let post_id = self.next_forum_post_id;
        self.next_forum_post_id += 1;
        Ok(post_id)
    }

    fn update_topic_title(&mut self, topic_id: i64, title: &str) -> Result<(), StoreError> {
        let topic = self
            .topics
            .get_mut(&topic_id)
            .ok_or(StoreError::TopicNotFound(topic_id))?;
        topic.title = title.to_string();
        Ok(())
    }
}

impl RelationshipStore for MemoryStore {
    fn insert_relationship(&mut self, new: &NewRelationship) -> Result<Relationship, StoreError> {
        let id = self.next_relationship_id;
        self.next_relationship_id += 1;
        let now = self.tick();

        let rel = Relationship {
            id,
            kind: new.kind,
            antecedent: new.antecedent.clone(),
            consequent: new.consequent.clone(),
            status: RelationStatus::Pending,
            creator: new.creator.clone(),
            approver: None,
            topic_id: None,
            forum_post_id: None,
            created_at_us: now,
            updated_at_us: now,
        };
        self.relationships.insert(id, rel.clone());
        Ok(rel)
    }

    fn update_relationship(&mut self, rel: &Relationship) -> Result<(), StoreError> {
        let now = self.tick();
        let slot = self
            .relationships
            .get_mut(&rel.id)
            .ok_or(StoreError::RelationshipNotFound(rel.id))?;
        *slot = rel.clone();
        slot.updated_at_us = now;
        Ok(())
    }

    fn get_relationship(&self, id: i64) -> Result<Option<Relationship>, StoreError> {
        Ok(self.relationships.get(&id).cloned())
    }

    fn all_relationships(&self) -> Result<Vec<Relationship>, StoreError> {
        Ok(self.relationships.values().cloned().collect())
    }

    fn append_undo_entries(
        &mut self,
        relationship_id: i64,
        entries: &[UndoEntry],
    ) -> Result<(), StoreError> {
        let log = self.undo_logs.entry(relationship_id).or_default();
        for entry in entries {
            let seq = self.next_undo_seq;
            self.next_undo_seq += 1;
            log.push((seq, entry.clone()));
        }
        Ok(())
    }

    fn load_undo_entries(
        &self,
        relationship_id: i64,
    ) -> Result<Vec<(i64, UndoEntry)>, StoreError> {
        Ok(self
            .undo_logs
            .get(&relationship_id)
            .cloned()
            .unwrap_or_default())
    }

    fn consume_undo_entry(&mut self, relationship_id: i64, seq: i64) -> Result<(), StoreError> {
        if let Some(log) = self.undo_logs.get_mut(&relationship_id) {
            log.retain(|(s, _)| *s != seq);
        }
        Ok(())
    }

    fn clear_undo_entries(&mut self, relationship_id: i64) -> Result<(), StoreError> {
        self.undo_logs.remove(&relationship_id);
        Ok(())
    }
}
