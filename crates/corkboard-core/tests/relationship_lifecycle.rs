//! End-to-end lifecycle tests against the SQLite store.

use corkboard_core::db::SqliteStore;
use corkboard_core::model::{Post, RelationKind, RelationStatus, TagName};
use corkboard_core::processor::{ProcessError, Processor};
use corkboard_core::retry::RetryPolicy;
use corkboard_core::store::{AllowAll, PostStore, RelationshipStore, TagCountStore};

fn tag(name: &str) -> TagName {
    TagName::new(name).unwrap()
}

fn seed(store: &mut SqliteStore, id: i64, tag_string: &str) {
    store
        .put_post(&Post {
            id,
            tags: Post::parse_tag_string(tag_string).unwrap(),
            last_editor: None,
            last_edit_was_automated: false,
            is_deleted: false,
        })
        .unwrap();
}

fn tag_string(store: &SqliteStore, id: i64) -> String {
    store.get_post(id).unwrap().unwrap().tag_string()
}

fn processor() -> Processor {
    Processor::new()
        .with_policy(RetryPolicy::immediate(5))
        .with_sleeper(|_| {})
}

#[test]
fn alias_approval_moves_posts_and_fixes_counts() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    seed(&mut store, 1, "aaa bbb ccc");
    seed(&mut store, 2, "bbb ccc ddd");
    seed(&mut store, 3, "ccc ddd eee");
    let p = processor();

    let rel = p
        .create(
            &mut store,
            RelationKind::Alias,
            tag("aaa"),
            tag("bbb"),
            "alice",
            false,
        )
        .unwrap();
    p.approve(&mut store, &AllowAll, rel.id, "mod").unwrap();

    let loaded = store.get_relationship(rel.id).unwrap().unwrap();
    assert_eq!(loaded.status, RelationStatus::Active);
    assert!(tag_string(&store, 1).contains("bbb"));
    assert!(!tag_string(&store, 1).contains("aaa"));
    assert_eq!(store.post_count(&tag("aaa")).unwrap(), 0);
    assert_eq!(store.post_count(&tag("bbb")).unwrap(), 2);
}

#[test]
fn no_two_active_aliases_share_an_antecedent() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let p = processor();

    let first = p
        .create(
            &mut store,
            RelationKind::Alias,
            tag("aaa"),
            tag("bbb"),
            "alice",
            true,
        )
        .unwrap();

    // Second proposal for the same antecedent is refused while the first
    // is merely pending.
    assert!(
        p.create(
            &mut store,
            RelationKind::Alias,
            tag("aaa"),
            tag("ccc"),
            "bob",
            true,
        )
        .is_err()
    );

    p.approve(&mut store, &AllowAll, first.id, "mod").unwrap();
    assert!(
        p.create(
            &mut store,
            RelationKind::Alias,
            tag("aaa"),
            tag("ccc"),
            "bob",
            true,
        )
        .is_err()
    );

    // The active alias never moved a post, so it cannot be undone out of
    // the way either.
    let err = p.undo(&mut store, &AllowAll, first.id, "mod").unwrap_err();
    assert!(matches!(err, ProcessError::NothingToUndo(_)));

    let active: Vec<_> = store
        .all_relationships()
        .unwrap()
        .into_iter()
        .filter(|r| r.status == RelationStatus::Active && r.kind == RelationKind::Alias)
        .collect();
    assert_eq!(active.len(), 1);
}

#[test]
fn implication_cycles_fail_at_any_chain_length() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let p = processor();

    let ab = p
        .create(
            &mut store,
            RelationKind::Implication,
            tag("a"),
            tag("b"),
            "alice",
            true,
        )
        .unwrap();
    let bc = p
        .create(
            &mut store,
            RelationKind::Implication,
            tag("b"),
            tag("c"),
            "alice",
            true,
        )
        .unwrap();
    p.approve(&mut store, &AllowAll, ab.id, "mod").unwrap();
    p.approve(&mut store, &AllowAll, bc.id, "mod").unwrap();

    let err = p
        .create(
            &mut store,
            RelationKind::Implication,
            tag("c"),
            tag("a"),
            "alice",
            true,
        )
        .unwrap_err();
    assert!(err.to_string().contains("circular relation"));
}

#[test]
fn redundant_implications_are_refused() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let p = processor();

    for (from, to) in [("a", "b"), ("b", "c")] {
        let rel = p
            .create(
                &mut store,
                RelationKind::Implication,
                tag(from),
                tag(to),
                "alice",
                true,
            )
            .unwrap();
        p.approve(&mut store, &AllowAll, rel.id, "mod").unwrap();
    }

    let err = p
        .create(
            &mut store,
            RelationKind::Implication,
            tag("a"),
            tag("c"),
            "alice",
            true,
        )
        .unwrap_err();
    assert!(err.to_string().contains("already implies"));
}

#[test]
fn implication_chain_applies_in_either_order() {
    let p = processor();

    for reversed in [false, true] {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, 1, "a");

        let ab = p
            .create(
                &mut store,
                RelationKind::Implication,
                tag("a"),
                tag("b"),
                "alice",
                true,
            )
            .unwrap();
        let bc = p
            .create(
                &mut store,
                RelationKind::Implication,
                tag("b"),
                tag("c"),
                "alice",
                true,
            )
            .unwrap();

        let order = if reversed { [bc.id, ab.id] } else { [ab.id, bc.id] };
        for id in order {
            p.approve(&mut store, &AllowAll, id, "mod").unwrap();
        }

        assert_eq!(tag_string(&store, 1), "a b c", "reversed = {reversed}");
    }
}

#[test]
fn undo_restores_posts_and_retires() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    seed(&mut store, 1, "aaa xxx");
    seed(&mut store, 2, "aaa bbb");
    let p = processor();

    let rel = p
        .create(
            &mut store,
            RelationKind::Alias,
            tag("aaa"),
            tag("bbb"),
            "alice",
            false,
        )
        .unwrap();
    p.approve(&mut store, &AllowAll, rel.id, "mod").unwrap();
    assert_eq!(tag_string(&store, 1), "bbb xxx");
    assert_eq!(tag_string(&store, 2), "bbb");

    let outcome = p.undo(&mut store, &AllowAll, rel.id, "mod").unwrap();
    assert_eq!(outcome.reverted, 2);

    let loaded = store.get_relationship(rel.id).unwrap().unwrap();
    assert_eq!(loaded.status, RelationStatus::Retired);
    assert_eq!(tag_string(&store, 1), "aaa xxx");
    assert_eq!(tag_string(&store, 2), "aaa bbb");
    assert_eq!(store.post_count(&tag("aaa")).unwrap(), 2);
    assert_eq!(store.post_count(&tag("bbb")).unwrap(), 1);

    // Undo again: no-op, still retired, tags untouched.
    let again = p.undo(&mut store, &AllowAll, rel.id, "mod").unwrap();
    assert_eq!(again.reverted, 0);
    assert_eq!(tag_string(&store, 1), "aaa xxx");

    // A retired alias cannot be re-approved.
    let err = p.approve(&mut store, &AllowAll, rel.id, "mod").unwrap_err();
    assert!(matches!(err, ProcessError::Transition(_)));
}

#[test]
fn rejected_relationships_stay_deleted() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let p = processor();

    let rel = p
        .create(
            &mut store,
            RelationKind::Implication,
            tag("aaa"),
            tag("bbb"),
            "alice",
            false,
        )
        .unwrap();
    p.reject(&mut store, &AllowAll, rel.id, "mod").unwrap();

    let loaded = store.get_relationship(rel.id).unwrap().unwrap();
    assert_eq!(loaded.status, RelationStatus::Deleted);

    let err = p.approve(&mut store, &AllowAll, rel.id, "mod").unwrap_err();
    assert!(matches!(err, ProcessError::Transition(_)));

    // The antecedent is free for a new proposal.
    assert!(
        p.create(
            &mut store,
            RelationKind::Implication,
            tag("aaa"),
            tag("bbb"),
            "alice",
            true,
        )
        .is_ok()
    );
}

#[test]
fn alias_chain_resolves_to_final_consequent() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    seed(&mut store, 1, "middle");
    seed(&mut store, 2, "head");
    let p = processor();

    let tail = p
        .create(
            &mut store,
            RelationKind::Alias,
            tag("middle"),
            tag("final"),
            "alice",
            true,
        )
        .unwrap();
    p.approve(&mut store, &AllowAll, tail.id, "mod").unwrap();

    let head = p
        .create(
            &mut store,
            RelationKind::Alias,
            tag("head"),
            tag("middle"),
            "alice",
            true,
        )
        .unwrap();
    p.approve(&mut store, &AllowAll, head.id, "mod").unwrap();

    // Posts tagged `head` land on `final`, not on `middle`.
    assert_eq!(tag_string(&store, 2), "final");
    assert_eq!(store.post_count(&tag("middle")).unwrap(), 0);
    assert_eq!(store.post_count(&tag("final")).unwrap(), 2);
}

#[test]
fn error_reason_survives_a_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let p = processor();
    let rel_id;

    {
        let mut store = corkboard_core::db::open_store(dir.path()).unwrap();
        let rel = p
            .create(
                &mut store,
                RelationKind::Alias,
                tag("aaa"),
                tag("bbb"),
                "alice",
                true,
            )
            .unwrap();
        rel_id = rel.id;

        let mut parked = rel;
        parked.status = RelationStatus::Queued;
        store.update_relationship(&parked).unwrap();
        parked.status = RelationStatus::Error("mover crashed mid-pass".into());
        store.update_relationship(&parked).unwrap();
    }

    let store = corkboard_core::db::open_store(dir.path()).unwrap();
    let loaded = store.get_relationship(rel_id).unwrap().unwrap();
    assert_eq!(
        loaded.status,
        RelationStatus::Error("mover crashed mid-pass".into())
    );
    assert_eq!(loaded.status.to_string(), "error: mover crashed mid-pass");
}
