//! `cork undo` — reverse an applied relationship.
//!
//! Moves the relationship to `retired` and replays its undo log in
//! reverse. Safe to re-run: a partial undo resumes, a completed one is a
//! no-op.

use crate::cmd::{AllowAll, open_engine};
use crate::output::{OutputMode, kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for `cork undo`.
#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Relationship id (active, error, or resuming a prior undo).
    pub id: i64,
}

#[derive(Serialize)]
struct UndoResult {
    id: i64,
    reverted: u64,
    skipped: u64,
}

/// Run the `cork undo` command.
pub fn run_undo(
    args: &UndoArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, processor) = open_engine(project_root)?;
    let outcome = processor.undo(&mut store, &AllowAll, args.id, actor)?;

    let result = UndoResult {
        id: args.id,
        reverted: outcome.reverted,
        skipped: outcome.skipped,
    };
    render(output, &result, |r, w| {
        kv(w, "undone", format!("#{}", r.id))?;
        kv(w, "reverted", r.reverted.to_string())?;
        kv(w, "skipped", r.skipped.to_string())
    })
}
