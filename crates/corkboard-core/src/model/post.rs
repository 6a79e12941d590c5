//! Post aggregates as the engine sees them.
//!
//! The engine does not own posts; it reads and rewrites their tag sets
//! through the [`crate::store::PostStore`] seam. The canonical storage form
//! is a space-separated, sorted `tag_string`; in memory the tag set is a
//! `BTreeSet` so duplicate collapse and deterministic ordering come for
//! free.

use crate::model::tag_name::{ParseTagNameError, TagName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A post row as loaded from the post store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub tags: BTreeSet<TagName>,
    pub last_editor: Option<String>,
    /// Whether the most recent edit was made by the engine rather than a
    /// human. Automated edits are exempt from the human edit-rate limit.
    pub last_edit_was_automated: bool,
    pub is_deleted: bool,
}

impl Post {
    /// Parse a stored tag string into a tag set, collapsing duplicates.
    ///
    /// # Errors
    ///
    /// Returns the first tag-name parse failure. Stored tag strings are
    /// written by [`render_tag_string`], so a failure here means the row
    /// was corrupted outside the engine.
    pub fn parse_tag_string(raw: &str) -> Result<BTreeSet<TagName>, ParseTagNameError> {
        raw.split_whitespace().map(TagName::new).collect()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &TagName) -> bool {
        self.tags.contains(tag)
    }

    /// Canonical storage form of this post's tag set.
    #[must_use]
    pub fn tag_string(&self) -> String {
        render_tag_string(&self.tags)
    }
}

/// Render a tag set to the canonical space-separated, sorted form.
#[must_use]
pub fn render_tag_string(tags: &BTreeSet<TagName>) -> String {
    let mut out = String::new();
    for tag in tags {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(tag.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Post, render_tag_string};
    use crate::model::tag_name::TagName;

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    #[test]
    fn parse_collapses_duplicates_and_sorts() {
        let tags = Post::parse_tag_string("ccc aaa bbb aaa").unwrap();
        assert_eq!(render_tag_string(&tags), "aaa bbb ccc");
    }

    #[test]
    fn parse_normalizes_entries() {
        let tags = Post::parse_tag_string("Long_Hair short_HAIR").unwrap();
        assert!(tags.contains(&tag("long_hair")));
        assert!(tags.contains(&tag("short_hair")));
    }

    #[test]
    fn empty_string_is_empty_set() {
        let tags = Post::parse_tag_string("").unwrap();
        assert!(tags.is_empty());
        assert_eq!(render_tag_string(&tags), "");
    }

    #[test]
    fn parse_rejects_corrupt_entries() {
        assert!(Post::parse_tag_string("ok -broken").is_err());
    }

    #[test]
    fn roundtrip_through_tag_string() {
        let post = Post {
            id: 7,
            tags: Post::parse_tag_string("bbb aaa").unwrap(),
            last_editor: None,
            last_edit_was_automated: false,
            is_deleted: false,
        };
        assert_eq!(post.tag_string(), "aaa bbb");
        assert_eq!(Post::parse_tag_string(&post.tag_string()).unwrap(), post.tags);
    }
}
