//! [`RelationshipStore`] over SQLite: relationship rows and undo logs.

use crate::db::SqliteStore;
use crate::model::{RelationKind, RelationStatus, Relationship, TagName};
use crate::store::{NewRelationship, RelationshipStore, StoreError};
use crate::undo::UndoEntry;
use rusqlite::{OptionalExtension, Row, params};
use std::str::FromStr;

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<RawRelationship> {
    Ok(RawRelationship {
        id: row.get(0)?,
        kind: row.get(1)?,
        antecedent: row.get(2)?,
        consequent: row.get(3)?,
        status: row.get(4)?,
        error_reason: row.get(5)?,
        creator: row.get(6)?,
        approver: row.get(7)?,
        topic_id: row.get(8)?,
        forum_post_id: row.get(9)?,
        created_at_us: row.get(10)?,
        updated_at_us: row.get(11)?,
    })
}

/// Row image before model-level parsing.
struct RawRelationship {
    id: i64,
    kind: String,
    antecedent: String,
    consequent: String,
    status: String,
    error_reason: Option<String>,
    creator: String,
    approver: Option<String>,
    topic_id: Option<i64>,
    forum_post_id: Option<i64>,
    created_at_us: i64,
    updated_at_us: i64,
}

impl RawRelationship {
    fn into_model(self) -> Result<Relationship, StoreError> {
        let id = self.id;

        Ok(Relationship {
            id,
            kind: RelationKind::from_str(&self.kind)
                .map_err(|err| corrupt_field(id, "kind", &err))?,
            antecedent: TagName::new(&self.antecedent)
                .map_err(|err| corrupt_field(id, "antecedent", &err))?,
            consequent: TagName::new(&self.consequent)
                .map_err(|err| corrupt_field(id, "consequent", &err))?,
            status: RelationStatus::from_parts(&self.status, self.error_reason)
                .map_err(|err| corrupt_field(id, "status", &err))?,
            creator: self.creator,
            approver: self.approver,
            topic_id: self.topic_id,
            forum_post_id: self.forum_post_id,
            created_at_us: self.created_at_us,
            updated_at_us: self.updated_at_us,
        })
    }
}

fn corrupt_field(id: i64, what: &str, err: &dyn std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("relationship {id} {what}: {err}"))
}

const RELATIONSHIP_COLUMNS: &str = "relationship_id, kind, antecedent, consequent, status, \
     error_reason, creator, approver, topic_id, forum_post_id, created_at_us, updated_at_us";

impl RelationshipStore for SqliteStore {
    fn insert_relationship(&mut self, new: &NewRelationship) -> Result<Relationship, StoreError> {
        let now = Self::now_us();
        self.conn.execute(
            "INSERT INTO tag_relationships
                (kind, antecedent, consequent, status, creator, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?5)",
            params![
                new.kind.to_string(),
                new.antecedent.as_str(),
                new.consequent.as_str(),
                new.creator,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        self.get_relationship(id)?
            .ok_or(StoreError::RelationshipNotFound(id))
    }

    fn update_relationship(&mut self, rel: &Relationship) -> Result<(), StoreError> {
        let error_reason = match &rel.status {
            RelationStatus::Error(reason) => Some(reason.as_str()),
            _ => None,
        };

        let updated = self.conn.execute(
            "UPDATE tag_relationships SET
                status = ?2,
                error_reason = ?3,
                approver = ?4,
                topic_id = ?5,
                forum_post_id = ?6,
                updated_at_us = ?7
             WHERE relationship_id = ?1",
            params![
                rel.id,
                rel.status.as_str(),
                error_reason,
                rel.approver,
                rel.topic_id,
                rel.forum_post_id,
                Self::now_us(),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RelationshipNotFound(rel.id));
        }
        Ok(())
    }

    fn get_relationship(&self, id: i64) -> Result<Option<Relationship>, StoreError> {
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM tag_relationships WHERE relationship_id = ?1"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let raw = stmt
            .query_row(params![id], relationship_from_row)
            .optional()?;

        raw.map(RawRelationship::into_model).transpose()
    }

    fn all_relationships(&self) -> Result<Vec<Relationship>, StoreError> {
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM tag_relationships ORDER BY relationship_id"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let raws = stmt
            .query_map([], relationship_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raws.into_iter().map(RawRelationship::into_model).collect()
    }

    fn append_undo_entries(
        &mut self,
        relationship_id: i64,
        entries: &[UndoEntry],
    ) -> Result<(), StoreError> {
        let now = Self::now_us();
        for entry in entries {
            self.conn.execute(
                "INSERT INTO undo_entries
                    (relationship_id, seq, post_id, removed_tag, added_tag, created_at_us)
                 SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2, ?3, ?4, ?5
                 FROM undo_entries WHERE relationship_id = ?1",
                params![
                    relationship_id,
                    entry.post_id,
                    entry.removed.as_ref().map(TagName::as_str),
                    entry.added.as_ref().map(TagName::as_str),
                    now,
                ],
            )?;
        }
        Ok(())
    }

    fn load_undo_entries(
        &self,
        relationship_id: i64,
    ) -> Result<Vec<(i64, UndoEntry)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT seq, post_id, removed_tag, added_tag
             FROM undo_entries WHERE relationship_id = ?1
             ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![relationship_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, post_id, removed, added)| {
                let parse = |raw: Option<String>| -> Result<Option<TagName>, StoreError> {
                    raw.map(|name| {
                        TagName::new(&name).map_err(|err| {
                            StoreError::Corrupt(format!("undo entry tag '{name}': {err}"))
                        })
                    })
                    .transpose()
                };
                Ok((
                    seq,
                    UndoEntry {
                        post_id,
                        removed: parse(removed)?,
                        added: parse(added)?,
                    },
                ))
            })
            .collect()
    }

    fn consume_undo_entry(&mut self, relationship_id: i64, seq: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM undo_entries WHERE relationship_id = ?1 AND seq = ?2",
            params![relationship_id, seq],
        )?;
        Ok(())
    }

    fn clear_undo_entries(&mut self, relationship_id: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM undo_entries WHERE relationship_id = ?1",
            params![relationship_id],
        )?;
        Ok(())
    }
}
