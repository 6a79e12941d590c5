//! [`TagCountStore`] over SQLite: the denormalized post-count cache.

use crate::db::SqliteStore;
use crate::model::TagName;
use crate::store::{StoreError, TagCountStore};
use rusqlite::{OptionalExtension, params};

impl TagCountStore for SqliteStore {
    fn post_count(&self, tag: &TagName) -> Result<i64, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT post_count FROM tags WHERE name = ?1")?;
        let count = stmt
            .query_row(params![tag.as_str()], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    fn recompute_post_count(&mut self, tag: &TagName) -> Result<i64, StoreError> {
        // Always derived from authoritative membership; the cache is never
        // incremented speculatively, so it converges after partial passes.
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts
             WHERE is_deleted = 0
               AND instr(' ' || tag_string || ' ', ' ' || ?1 || ' ') > 0",
            params![tag.as_str()],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO tags (name, post_count, updated_at_us)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                post_count = excluded.post_count,
                updated_at_us = excluded.updated_at_us",
            params![tag.as_str(), count, Self::now_us()],
        )?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::SqliteStore;
    use crate::model::{Post, TagName};
    use crate::store::{PostStore, TagCountStore};

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    fn seed(store: &mut SqliteStore, id: i64, tag_string: &str, deleted: bool) {
        store
            .put_post(&Post {
                id,
                tags: Post::parse_tag_string(tag_string).unwrap(),
                last_editor: None,
                last_edit_was_automated: false,
                is_deleted: deleted,
            })
            .unwrap();
    }

    #[test]
    fn unknown_tag_counts_zero() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.post_count(&tag("nobody")).unwrap(), 0);
    }

    #[test]
    fn recompute_reflects_membership() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, 1, "aaa bbb", false);
        seed(&mut store, 2, "bbb", false);
        seed(&mut store, 3, "bbb", true);

        assert_eq!(store.recompute_post_count(&tag("aaa")).unwrap(), 1);
        // Deleted posts do not count.
        assert_eq!(store.recompute_post_count(&tag("bbb")).unwrap(), 2);
        assert_eq!(store.post_count(&tag("bbb")).unwrap(), 2);
    }

    #[test]
    fn recompute_overwrites_stale_cache() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, 1, "aaa", false);
        store.recompute_post_count(&tag("aaa")).unwrap();

        // The post loses the tag; cache is stale until recomputed.
        store
            .update_post_tags(1, "editor", true, &mut |tags| {
                tags.clear();
            })
            .unwrap();
        assert_eq!(store.post_count(&tag("aaa")).unwrap(), 1);
        assert_eq!(store.recompute_post_count(&tag("aaa")).unwrap(), 0);
        assert_eq!(store.post_count(&tag("aaa")).unwrap(), 0);
    }
}
