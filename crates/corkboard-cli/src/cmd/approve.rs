//! `cork approve` — approve a pending proposal and apply it.
//!
//! Runs the whole apply inline: re-validation, the streaming move with
//! bounded retry, count fixups, and topic notification. A failed apply
//! leaves the relationship parked in `error` for `cork retry` or
//! `cork undo`.

use crate::cmd::{AllowAll, open_engine};
use crate::output::{OutputMode, kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for `cork approve`.
#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Relationship id.
    pub id: i64,
}

#[derive(Serialize)]
struct ApproveResult {
    id: i64,
    updated: u64,
    skipped: u64,
    consequent_post_count: i64,
}

/// Run the `cork approve` command.
pub fn run_approve(
    args: &ApproveArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, processor) = open_engine(project_root)?;
    let outcome = processor.approve(&mut store, &AllowAll, args.id, actor)?;

    let result = ApproveResult {
        id: args.id,
        updated: outcome.updated,
        skipped: outcome.skipped,
        consequent_post_count: outcome.consequent_post_count,
    };
    render(output, &result, |r, w| {
        kv(w, "approved", format!("#{}", r.id))?;
        kv(w, "updated", r.updated.to_string())?;
        kv(w, "skipped", r.skipped.to_string())?;
        kv(w, "post_count", r.consequent_post_count.to_string())
    })
}
