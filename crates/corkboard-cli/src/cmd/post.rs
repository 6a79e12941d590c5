//! `cork post` — seed or inspect a post's tag set.
//!
//! With tags, sets the post's tag set as a human edit; without, shows the
//! post. Mainly an operator/testing convenience: real posts come in
//! through the web application.

use crate::cmd::open_engine;
use crate::output::{OutputMode, kv, render};
use anyhow::{Context, Result, bail};
use clap::Args;
use corkboard_core::model::Post;
use corkboard_core::store::PostStore;
use std::collections::BTreeSet;
use std::path::Path;

/// Arguments for `cork post`.
#[derive(Args, Debug)]
pub struct PostArgs {
    /// Post id.
    pub id: i64,

    /// Tags to set on the post (replaces the whole tag set). Omit to show
    /// the post instead.
    #[arg(value_name = "TAG")]
    pub tags: Vec<String>,
}

/// Run the `cork post` command.
pub fn run_post(
    args: &PostArgs,
    actor: &str,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let (mut store, _processor) = open_engine(project_root)?;

    if args.tags.is_empty() {
        let Some(post) = store.get_post(args.id)? else {
            bail!("post #{} not found", args.id);
        };
        return render(output, &post, |p, w| {
            kv(w, "post", p.id.to_string())?;
            kv(w, "tags", p.tag_string())?;
            kv(w, "editor", p.last_editor.as_deref().unwrap_or("-"))
        });
    }

    let tags: BTreeSet<_> = args
        .tags
        .iter()
        .map(|raw| {
            corkboard_core::model::TagName::new(raw)
                .with_context(|| format!("invalid tag '{raw}'"))
        })
        .collect::<Result<_>>()?;

    let post = match store.get_post(args.id)? {
        Some(mut existing) => {
            store.update_post_tags(args.id, actor, false, &mut |set| {
                *set = tags.clone();
            })?;
            existing.tags = tags;
            existing
        }
        None => {
            let post = Post {
                id: args.id,
                tags,
                last_editor: Some(actor.to_string()),
                last_edit_was_automated: false,
                is_deleted: false,
            };
            store.put_post(&post)?;
            post
        }
    };

    render(output, &post, |p, w| {
        kv(w, "post", p.id.to_string())?;
        kv(w, "tags", p.tag_string())
    })
}
