//! [`Forum`] over SQLite: the discussion-topic seam.
//!
//! In the full deployment the forum is its own subsystem; this
//! implementation backs the same narrow interface with two local tables so
//! the engine's topic synchronization is observable end-to-end.

use crate::db::SqliteStore;
use crate::store::{Forum, StoreError};
use rusqlite::params;

impl Forum for SqliteStore {
    fn create_topic(&mut self, title: &str, body: &str) -> Result<i64, StoreError> {
        let now = Self::now_us();
        self.conn.execute(
            "INSERT INTO forum_topics (title, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?2)",
            params![title, now],
        )?;
        let topic_id = self.conn.last_insert_rowid();

        self.conn.execute(
            "INSERT INTO forum_posts (topic_id, body, created_at_us) VALUES (?1, ?2, ?3)",
            params![topic_id, body, now],
        )?;

        Ok(topic_id)
    }

    fn post_message(&mut self, topic_id: i64, body: &str) -> Result<i64, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM forum_topics WHERE topic_id = ?1)",
            params![topic_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::TopicNotFound(topic_id));
        }

        self.conn.execute(
            "INSERT INTO forum_posts (topic_id, body, created_at_us) VALUES (?1, ?2, ?3)",
            params![topic_id, body, Self::now_us()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_topic_title(&mut self, topic_id: i64, title: &str) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE forum_topics SET title = ?2, updated_at_us = ?3 WHERE topic_id = ?1",
            params![topic_id, title, Self::now_us()],
        )?;
        if updated == 0 {
            return Err(StoreError::TopicNotFound(topic_id));
        }
        Ok(())
    }
}
