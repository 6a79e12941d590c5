//! `cork init` — initialize a corkboard project in a directory.

use crate::output::{OutputMode, kv, render};
use anyhow::{Context, Result};
use clap::Args;
use corkboard_core::db;
use serde::Serialize;
use std::path::Path;

/// Default project config written on init, with every knob spelled out.
const DEFAULT_CONFIG: &str = "\
[retry]
max_attempts = 5
base_backoff_ms = 1000

[mover]
batch_size = 1000

[forum]
update_topics = true
";

/// Arguments for `cork init`.
#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Serialize)]
struct InitResult {
    root: String,
    created_config: bool,
}

/// Run the `cork init` command.
pub fn run_init(_args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = project_root.join(".corkboard");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    let created_config = if config_path.exists() {
        false
    } else {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .with_context(|| format!("write {}", config_path.display()))?;
        true
    };

    // Creates and migrates the database.
    let _store = db::open_store(project_root)?;

    let result = InitResult {
        root: project_root.display().to_string(),
        created_config,
    };
    render(output, &result, |r, w| {
        kv(w, "initialized", &r.root)?;
        kv(w, "config", if r.created_config { "created" } else { "kept" })
    })
}

#[cfg(test)]
mod tests {
    use super::{InitArgs, run_init};
    use crate::output::OutputMode;
    use tempfile::TempDir;

    #[test]
    fn init_creates_store_and_config() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).unwrap();

        assert!(dir.path().join(".corkboard/config.toml").exists());
        assert!(dir.path().join(".corkboard/corkboard.db").exists());
    }

    #[test]
    fn init_twice_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).unwrap();

        let config_path = dir.path().join(".corkboard/config.toml");
        std::fs::write(&config_path, "[retry]\nmax_attempts = 2\n").unwrap();

        run_init(&InitArgs {}, OutputMode::Json, dir.path()).unwrap();
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("max_attempts = 2"));
    }

    #[test]
    fn default_config_parses() {
        let dir = TempDir::new().unwrap();
        run_init(&InitArgs {}, OutputMode::Json, dir.path()).unwrap();

        let cfg = corkboard_core::config::load_config(dir.path()).unwrap();
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.mover.batch_size, 1000);
    }
}
