//! `cork reject` — reject a proposal before it is applied.

use crate::cmd::{AllowAll, open_engine};
use crate::output::{OutputMode, kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for `cork reject`.
#[derive(Args, Debug)]
pub struct RejectArgs {
    /// Relationship id.
    pub id: i64,
}

#[derive(Serialize)]
struct RejectResult {
    id: i64,
    status: String,
}

/// Run the `cork reject` command.
pub fn run_reject(
    args: &RejectArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, processor) = open_engine(project_root)?;
    processor.reject(&mut store, &AllowAll, args.id, actor)?;

    let result = RejectResult {
        id: args.id,
        status: "deleted".into(),
    };
    render(output, &result, |r, w| {
        kv(w, "rejected", format!("#{}", r.id))?;
        kv(w, "status", &r.status)
    })
}
