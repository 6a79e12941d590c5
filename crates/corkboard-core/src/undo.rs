//! The undo log: exact per-post edit records for reversing a tag move.
//!
//! Every edit a [`crate::mover`] pass makes is recorded as one
//! [`UndoEntry`]. The log is:
//!
//! - **append-only** while the relationship is `processing` (retry attempts
//!   append to the same log; a post already moved never re-matches the
//!   stream, so no edit is recorded twice);
//! - an **immutable snapshot** once the relationship is `active`;
//! - **consumed destructively** during undo — each entry is deleted from
//!   the store only after its reversal commits, so a crash mid-undo leaves
//!   a valid, resumable remainder rather than double-applying reversals.
//!
//! Undo is best-effort by contract: if a post's tags were independently
//! edited after the original move, the entry's guard may no longer hold
//! and the entry is consumed without touching the post. That divergence is
//! documented behavior, not a correctness bug.

use crate::model::TagName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One recorded per-post edit.
///
/// | move kind | post state at move time | removed | added |
/// |---|---|---|---|
/// | alias | lacked the consequent | antecedent | consequent |
/// | alias | already had the consequent | antecedent | — |
/// | implication | any | — | consequent |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub post_id: i64,
    /// Tag taken off the post (the alias antecedent), if any.
    pub removed: Option<TagName>,
    /// Tag put onto the post (the consequent), if it was not already there.
    pub added: Option<TagName>,
}

impl UndoEntry {
    /// Reverse this entry onto `tags`, best-effort.
    ///
    /// The guard: a tag we added is only taken back off while it is still
    /// present, and a tag we removed is only restored while it is absent —
    /// and, when both sides were recorded, only together. Returns whether
    /// the tag set changed.
    pub fn reverse_onto(&self, tags: &mut BTreeSet<TagName>) -> bool {
        match (&self.removed, &self.added) {
            (Some(removed), Some(added)) => {
                if !tags.contains(added) || tags.contains(removed) {
                    return false;
                }
                tags.remove(added);
                tags.insert(removed.clone());
                true
            }
            (Some(removed), None) => tags.insert(removed.clone()),
            (None, Some(added)) => tags.remove(added),
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UndoEntry;
    use crate::model::{Post, TagName};
    use std::collections::BTreeSet;

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    fn tags(raw: &str) -> BTreeSet<TagName> {
        Post::parse_tag_string(raw).unwrap()
    }

    fn entry(post_id: i64, removed: Option<&str>, added: Option<&str>) -> UndoEntry {
        UndoEntry {
            post_id,
            removed: removed.map(|n| tag(n)),
            added: added.map(|n| tag(n)),
        }
    }

    #[test]
    fn alias_entry_swaps_back() {
        let mut set = tags("bbb ccc");
        let changed = entry(1, Some("aaa"), Some("bbb")).reverse_onto(&mut set);

        assert!(changed);
        assert_eq!(set, tags("aaa ccc"));
    }

    #[test]
    fn alias_entry_without_added_restores_only() {
        // Post already had the consequent at move time; only the antecedent
        // was dropped, so only the antecedent comes back.
        let mut set = tags("bbb ccc");
        let changed = entry(1, Some("aaa"), None).reverse_onto(&mut set);

        assert!(changed);
        assert_eq!(set, tags("aaa bbb ccc"));
    }

    #[test]
    fn implication_entry_removes_added_tag() {
        let mut set = tags("aaa bbb");
        let changed = entry(1, None, Some("bbb")).reverse_onto(&mut set);

        assert!(changed);
        assert_eq!(set, tags("aaa"));
    }

    #[test]
    fn guard_skips_when_added_tag_was_independently_removed() {
        let mut set = tags("ccc");
        let changed = entry(1, Some("aaa"), Some("bbb")).reverse_onto(&mut set);

        assert!(!changed);
        assert_eq!(set, tags("ccc"));
    }

    #[test]
    fn guard_skips_when_removed_tag_was_independently_restored() {
        let mut set = tags("aaa bbb");
        let changed = entry(1, Some("aaa"), Some("bbb")).reverse_onto(&mut set);

        assert!(!changed);
        assert_eq!(set, tags("aaa bbb"));
    }

    #[test]
    fn reversal_is_idempotent() {
        let mut set = tags("bbb");
        let e = entry(1, Some("aaa"), Some("bbb"));

        assert!(e.reverse_onto(&mut set));
        assert!(!e.reverse_onto(&mut set));
        assert_eq!(set, tags("aaa"));
    }

    #[test]
    fn serde_roundtrip() {
        let e = entry(42, Some("aaa"), None);
        let json = serde_json::to_string(&e).unwrap();
        let back: UndoEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
