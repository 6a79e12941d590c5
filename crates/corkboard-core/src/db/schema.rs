//! Canonical SQLite schema for the corkboard store.
//!
//! Normalized for the engine's access patterns:
//! - `posts` keeps each post's canonical tag string plus edit attribution
//! - `tags` is the denormalized post-count cache
//! - `tag_relationships` holds alias/implication rows and their lifecycle
//!   status (`error_reason` is populated only for `status = 'error'`)
//! - `undo_entries` is the per-relationship undo log, keyed by an
//!   append-order sequence so undo can consume it back-to-front
//! - `forum_topics` / `forum_posts` back the discussion-topic seam
//! - `store_meta` tracks the schema version for migrations

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS posts (
    post_id INTEGER PRIMARY KEY,
    tag_string TEXT NOT NULL DEFAULT '',
    last_editor TEXT,
    last_edit_was_automated INTEGER NOT NULL DEFAULT 0
        CHECK (last_edit_was_automated IN (0, 1)),
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    name TEXT PRIMARY KEY CHECK (length(trim(name)) > 0),
    post_count INTEGER NOT NULL DEFAULT 0,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS forum_topics (
    topic_id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS forum_posts (
    forum_post_id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_id INTEGER NOT NULL REFERENCES forum_topics(topic_id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tag_relationships (
    relationship_id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL CHECK (kind IN ('alias', 'implication')),
    antecedent TEXT NOT NULL,
    consequent TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (
        status IN ('pending', 'queued', 'processing', 'active', 'retired', 'deleted', 'error')
    ),
    error_reason TEXT,
    creator TEXT NOT NULL,
    approver TEXT,
    topic_id INTEGER REFERENCES forum_topics(topic_id) ON DELETE SET NULL,
    forum_post_id INTEGER,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (antecedent <> consequent)
);

CREATE TABLE IF NOT EXISTS undo_entries (
    relationship_id INTEGER NOT NULL
        REFERENCES tag_relationships(relationship_id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    post_id INTEGER NOT NULL,
    removed_tag TEXT,
    added_tag TEXT,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (relationship_id, seq),
    CHECK (removed_tag IS NOT NULL OR added_tag IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_relationships_status
    ON tag_relationships(status, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_relationships_kind_antecedent
    ON tag_relationships(kind, antecedent);

CREATE INDEX IF NOT EXISTS idx_posts_deleted
    ON posts(is_deleted, post_id);

CREATE INDEX IF NOT EXISTS idx_forum_posts_topic
    ON forum_posts(topic_id, created_at_us);
";
