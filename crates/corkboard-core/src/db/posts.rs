//! [`PostStore`] over SQLite.
//!
//! Tag membership is a substring probe against the canonical
//! space-separated `tag_string` (`instr` rather than `LIKE`, so underscores
//! in tag names are not treated as wildcards). The scan is linear; in the
//! full deployment the search index fronts these queries, but that index
//! is a collaborator outside this engine, and the mover's paged streaming
//! keeps the per-batch cost bounded either way.

use crate::db::SqliteStore;
use crate::model::{Post, TagName};
use crate::store::{PostStore, StoreError};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeSet;

/// Membership predicate over the padded tag string.
const TAG_MATCH: &str = "instr(' ' || tag_string || ' ', ' ' || ?1 || ' ') > 0";

impl PostStore for SqliteStore {
    fn posts_with_tag_after(
        &self,
        tag: &TagName,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, StoreError> {
        let sql = format!(
            "SELECT post_id FROM posts
             WHERE is_deleted = 0 AND post_id > ?2 AND {TAG_MATCH}
             ORDER BY post_id ASC
             LIMIT ?3"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map(
                params![tag.as_str(), after_id, i64::try_from(limit).unwrap_or(i64::MAX)],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT post_id, tag_string, last_editor, last_edit_was_automated, is_deleted
             FROM posts WHERE post_id = ?1",
        )?;
        let row = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })
            .optional()?;

        let Some((post_id, tag_string, last_editor, automated, is_deleted)) = row else {
            return Ok(None);
        };

        let tags = Post::parse_tag_string(&tag_string)
            .map_err(|err| StoreError::Corrupt(format!("post {post_id} tag string: {err}")))?;

        Ok(Some(Post {
            id: post_id,
            tags,
            last_editor,
            last_edit_was_automated: automated,
            is_deleted,
        }))
    }

    fn put_post(&mut self, post: &Post) -> Result<(), StoreError> {
        let now = Self::now_us();
        self.conn.execute(
            "INSERT INTO posts
                (post_id, tag_string, last_editor, last_edit_was_automated, is_deleted,
                 created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(post_id) DO UPDATE SET
                tag_string = excluded.tag_string,
                last_editor = excluded.last_editor,
                last_edit_was_automated = excluded.last_edit_was_automated,
                is_deleted = excluded.is_deleted,
                updated_at_us = excluded.updated_at_us",
            params![
                post.id,
                post.tag_string(),
                post.last_editor,
                post.last_edit_was_automated,
                post.is_deleted,
                now,
            ],
        )?;
        Ok(())
    }

    fn update_post_tags(
        &mut self,
        id: i64,
        editor: &str,
        automated: bool,
        edit: &mut dyn FnMut(&mut BTreeSet<TagName>),
    ) -> Result<bool, StoreError> {
        // BEGIN IMMEDIATE takes the write lock before the read half of the
        // read-modify-write, which is the per-post exclusion contract.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = tx
            .query_row(
                "SELECT tag_string, is_deleted FROM posts WHERE post_id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?;

        let Some((tag_string, is_deleted)) = row else {
            return Err(StoreError::PostNotFound(id));
        };
        if is_deleted {
            return Err(StoreError::PostDeleted(id));
        }

        let mut tags = Post::parse_tag_string(&tag_string)
            .map_err(|err| StoreError::Corrupt(format!("post {id} tag string: {err}")))?;
        let before = tags.clone();
        edit(&mut tags);
        let changed = tags != before;

        if changed {
            let rendered = crate::model::post::render_tag_string(&tags);
            tx.execute(
                "UPDATE posts SET
                    tag_string = ?2,
                    last_editor = ?3,
                    last_edit_was_automated = ?4,
                    updated_at_us = ?5
                 WHERE post_id = ?1",
                params![id, rendered, editor, automated, Self::now_us()],
            )?;
        }

        tx.commit()?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::SqliteStore;
    use crate::model::{Post, TagName};
    use crate::store::{PostStore, StoreError};

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    fn post(id: i64, tag_string: &str) -> Post {
        Post {
            id,
            tags: Post::parse_tag_string(tag_string).unwrap(),
            last_editor: None,
            last_edit_was_automated: false,
            is_deleted: false,
        }
    }

    fn store_with_posts(rows: &[(i64, &str)]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for &(id, tags) in rows {
            store.put_post(&post(id, tags)).unwrap();
        }
        store
    }

    #[test]
    fn stream_matches_whole_tags_only() {
        let store = store_with_posts(&[
            (1, "long_hair"),
            (2, "long_hair_ribbon"),
            (3, "very_long_hair"),
            (4, "hat long_hair"),
        ]);

        // `long_hair` must not match `long_hair_ribbon` or
        // `very_long_hair`.
        assert_eq!(
            store.posts_with_tag_after(&tag("long_hair"), 0, 10).unwrap(),
            vec![1, 4]
        );
    }

    #[test]
    fn stream_pages_in_ascending_order() {
        let store = store_with_posts(&[(5, "aaa"), (1, "aaa"), (9, "aaa"), (3, "bbb")]);

        assert_eq!(store.posts_with_tag_after(&tag("aaa"), 0, 2).unwrap(), vec![1, 5]);
        assert_eq!(store.posts_with_tag_after(&tag("aaa"), 5, 2).unwrap(), vec![9]);
        assert!(store.posts_with_tag_after(&tag("aaa"), 9, 2).unwrap().is_empty());
    }

    #[test]
    fn deleted_posts_are_not_streamed() {
        let mut store = store_with_posts(&[(1, "aaa")]);
        let mut gone = post(2, "aaa");
        gone.is_deleted = true;
        store.put_post(&gone).unwrap();

        assert_eq!(store.posts_with_tag_after(&tag("aaa"), 0, 10).unwrap(), vec![1]);
    }

    #[test]
    fn get_post_roundtrips() {
        let store = store_with_posts(&[(7, "bbb aaa")]);
        let loaded = store.get_post(7).unwrap().unwrap();
        assert_eq!(loaded.tag_string(), "aaa bbb");
        assert!(store.get_post(8).unwrap().is_none());
    }

    #[test]
    fn update_post_tags_saves_attribution_only_on_change() {
        let mut store = store_with_posts(&[(1, "aaa")]);

        let changed = store
            .update_post_tags(1, "editor", true, &mut |tags| {
                tags.insert(tag("bbb"));
            })
            .unwrap();
        assert!(changed);

        let loaded = store.get_post(1).unwrap().unwrap();
        assert_eq!(loaded.tag_string(), "aaa bbb");
        assert_eq!(loaded.last_editor.as_deref(), Some("editor"));
        assert!(loaded.last_edit_was_automated);

        // No-op edit leaves attribution untouched.
        let changed = store
            .update_post_tags(1, "someone_else", false, &mut |tags| {
                tags.insert(tag("bbb"));
            })
            .unwrap();
        assert!(!changed);
        let loaded = store.get_post(1).unwrap().unwrap();
        assert_eq!(loaded.last_editor.as_deref(), Some("editor"));
    }

    #[test]
    fn update_missing_post_is_not_found() {
        let mut store = store_with_posts(&[]);
        assert!(matches!(
            store.update_post_tags(1, "x", true, &mut |_| {}),
            Err(StoreError::PostNotFound(1))
        ));
    }

    #[test]
    fn update_deleted_post_is_rejected() {
        let mut store = store_with_posts(&[]);
        let mut gone = post(1, "aaa");
        gone.is_deleted = true;
        store.put_post(&gone).unwrap();

        assert!(matches!(
            store.update_post_tags(1, "x", true, &mut |_| {}),
            Err(StoreError::PostDeleted(1))
        ));
    }
}
