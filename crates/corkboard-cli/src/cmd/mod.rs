//! Command handlers for the `cork` binary.
//!
//! Each submodule owns one subcommand: an args struct and a `run_*`
//! function taking the resolved actor, output mode, and project root.
//! Authorization at the CLI is the permissive [`AllowAll`] policy; the
//! real approval policy lives with the web application, not here.

pub mod approve;
pub mod init;
pub mod list;
pub mod post;
pub mod propose;
pub mod reject;
pub mod retry;
pub mod show;
pub mod undo;

use anyhow::{Context, Result, bail};
use corkboard_core::config;
use corkboard_core::db::{self, SqliteStore};
use corkboard_core::error::ErrorCode;
use corkboard_core::processor::Processor;
pub use corkboard_core::store::AllowAll;
use std::path::Path;

/// Resolve the acting user: `--actor` flag, then the user config's
/// `default_actor`, then `$USER`, then `"anonymous"`.
#[must_use]
pub fn resolve_actor(flag: Option<&str>) -> String {
    if let Some(actor) = flag {
        return actor.to_string();
    }
    if let Ok(cfg) = config::load_user_config() {
        if let Some(actor) = cfg.default_actor {
            return actor;
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "anonymous".to_string())
}

/// Open the store and build a processor from the project config.
///
/// # Errors
///
/// Fails with [`ErrorCode::NotInitialized`] guidance when `root` has no
/// `.corkboard/` directory.
pub fn open_engine(root: &Path) -> Result<(SqliteStore, Processor)> {
    if !root.join(".corkboard").exists() {
        bail!(
            "{}: {}. {}",
            ErrorCode::NotInitialized.code(),
            ErrorCode::NotInitialized.message(),
            ErrorCode::NotInitialized.hint().unwrap_or_default()
        );
    }

    let store = db::open_store(root).context("open corkboard store")?;
    let cfg = config::load_config(root).context("load project config")?;
    let processor =
        Processor::from_config(&cfg).with_lock_dir(root.join(".corkboard/locks"));
    Ok((store, processor))
}
