//! `cork retry` — re-run the apply for an error-parked relationship.
//!
//! Partial progress from the failed pass is preserved: already-moved posts
//! are not re-edited and the undo log keeps growing from where it stopped.

use crate::cmd::{AllowAll, open_engine};
use crate::output::{OutputMode, kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for `cork retry`.
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Relationship id (must be in the error state).
    pub id: i64,
}

#[derive(Serialize)]
struct RetryResult {
    id: i64,
    updated: u64,
    skipped: u64,
}

/// Run the `cork retry` command.
pub fn run_retry(
    args: &RetryArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, processor) = open_engine(project_root)?;
    let outcome = processor.retry(&mut store, &AllowAll, args.id, actor)?;

    let result = RetryResult {
        id: args.id,
        updated: outcome.updated,
        skipped: outcome.skipped,
    };
    render(output, &result, |r, w| {
        kv(w, "retried", format!("#{}", r.id))?;
        kv(w, "updated", r.updated.to_string())?;
        kv(w, "skipped", r.skipped.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::{RetryArgs, run_retry};
    use crate::cmd::init::{InitArgs, run_init};
    use crate::cmd::propose::{ProposeArgs, run_propose};
    use crate::output::OutputMode;
    use tempfile::TempDir;

    #[test]
    fn retry_of_pending_relationship_is_refused() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).unwrap();
        run_propose(
            &ProposeArgs {
                kind: "alias".into(),
                antecedent: "aaa".into(),
                consequent: "bbb".into(),
                no_forum: true,
            },
            "alice",
            OutputMode::Json,
            dir.path(),
        )
        .unwrap();

        let err =
            run_retry(&RetryArgs { id: 1 }, "mod", OutputMode::Json, dir.path()).unwrap_err();
        assert!(err.to_string().contains("invalid transition"));
    }
}
