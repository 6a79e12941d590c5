//! `cork show` — full details for one relationship.

use crate::cmd::open_engine;
use crate::output::{OutputMode, kv, render};
use anyhow::{Result, bail};
use clap::Args;
use corkboard_core::model::Relationship;
use corkboard_core::store::RelationshipStore;
use serde::Serialize;
use std::path::Path;

/// Arguments for `cork show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Relationship id.
    pub id: i64,
}

#[derive(Serialize)]
struct ShowResult {
    #[serde(flatten)]
    relationship: Relationship,
    undo_entries: usize,
}

/// Run the `cork show` command.
pub fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let (store, _processor) = open_engine(project_root)?;

    let Some(relationship) = store.get_relationship(args.id)? else {
        bail!("relationship #{} not found", args.id);
    };
    let undo_entries = store.load_undo_entries(args.id)?.len();

    let result = ShowResult {
        relationship,
        undo_entries,
    };
    render(output, &result, |r, w| {
        let rel = &r.relationship;
        kv(w, "relationship", format!("#{}", rel.id))?;
        kv(w, "kind", rel.kind.to_string())?;
        kv(w, "relation", format!("{} -> {}", rel.antecedent, rel.consequent))?;
        kv(w, "status", rel.status.to_string())?;
        kv(w, "creator", &rel.creator)?;
        kv(w, "approver", rel.approver.as_deref().unwrap_or("-"))?;
        match rel.topic_id {
            Some(topic) => kv(w, "topic", format!("#{topic}"))?,
            None => kv(w, "topic", "-")?,
        }
        kv(w, "undo_log", format!("{} entries", r.undo_entries))
    })
}
