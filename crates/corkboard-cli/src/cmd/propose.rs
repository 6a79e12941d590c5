//! `cork propose` — create a pending alias or implication proposal.

use crate::cmd::open_engine;
use crate::output::{OutputMode, kv, render};
use anyhow::{Context, Result};
use clap::Args;
use corkboard_core::model::{RelationKind, TagName};
use std::path::Path;
use std::str::FromStr;

/// Arguments for `cork propose`.
#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// Relationship kind: `alias` or `implication`.
    pub kind: String,

    /// Tag being renamed away from (alias) or the triggering tag
    /// (implication).
    pub antecedent: String,

    /// Tag being renamed to (alias) or automatically added (implication).
    pub consequent: String,

    /// Skip creating the discussion topic.
    #[arg(long)]
    pub no_forum: bool,
}

/// Run the `cork propose` command.
pub fn run_propose(
    args: &ProposeArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, processor) = open_engine(project_root)?;

    let kind = RelationKind::from_str(&args.kind)
        .with_context(|| format!("unknown relationship kind '{}'", args.kind))?;
    let antecedent = TagName::new(&args.antecedent)
        .with_context(|| format!("invalid antecedent '{}'", args.antecedent))?;
    let consequent = TagName::new(&args.consequent)
        .with_context(|| format!("invalid consequent '{}'", args.consequent))?;

    let rel = processor.create(&mut store, kind, antecedent, consequent, actor, args.no_forum)?;

    render(output, &rel, |r, w| {
        kv(w, "proposed", format!("#{}", r.id))?;
        kv(w, "kind", r.kind.to_string())?;
        kv(w, "relation", format!("{} -> {}", r.antecedent, r.consequent))?;
        kv(w, "status", r.status.to_string())?;
        match r.topic_id {
            Some(topic) => kv(w, "topic", format!("#{topic}")),
            None => kv(w, "topic", "-"),
        }
    })
}
