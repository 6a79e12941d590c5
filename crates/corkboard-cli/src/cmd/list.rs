//! `cork list` — list tag relationships, optionally filtered by status.

use crate::cmd::open_engine;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use corkboard_core::model::Relationship;
use corkboard_core::store::RelationshipStore;
use std::io::Write;
use std::path::Path;

/// Arguments for `cork list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show relationships in this status (e.g. `pending`, `active`,
    /// `error`).
    #[arg(long)]
    pub status: Option<String>,
}

/// Run the `cork list` command.
pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let (store, _processor) = open_engine(project_root)?;

    let mut relationships = store.all_relationships()?;
    if let Some(filter) = &args.status {
        let filter = filter.trim().to_ascii_lowercase();
        relationships.retain(|rel| rel.status.as_str() == filter);
    }

    render(output, &relationships, |rels, w| {
        if rels.is_empty() {
            return writeln!(w, "no relationships");
        }
        for rel in rels {
            write_line(rel, w)?;
        }
        Ok(())
    })
}

fn write_line(rel: &Relationship, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "#{:<4} {:<12} {} -> {} [{}]",
        rel.id, rel.kind, rel.antecedent, rel.consequent, rel.status
    )
}

#[cfg(test)]
mod tests {
    use super::{ListArgs, run_list};
    use crate::cmd::init::{InitArgs, run_init};
    use crate::cmd::propose::{ProposeArgs, run_propose};
    use crate::output::OutputMode;
    use tempfile::TempDir;

    #[test]
    fn list_runs_with_and_without_filter() {
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

        run_list(&ListArgs { status: None }, OutputMode::Json, dir.path()).unwrap();
        run_list(
            &ListArgs {
                status: Some("pending".into()),
            },
            OutputMode::Json,
            dir.path(),
        )
        .unwrap();
        run_list(
            &ListArgs {
                status: Some("active".into()),
            },
            OutputMode::Json,
            dir.path(),
        )
        .unwrap();
    }
}
