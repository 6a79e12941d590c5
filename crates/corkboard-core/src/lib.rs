//! corkboard-core: the tag relationship processing engine.
//!
//! Tags on corkboard form a controlled vocabulary. Users propose that one
//! tag be renamed into another (an *alias*) or that one tag always bring
//! another with it (an *implication*). This crate owns the full lifecycle
//! of those proposals: graph-consistency validation, the
//! pending → queued → processing → active state machine, the streaming bulk
//! rewrite of post tag strings, the undo log that makes an applied
//! relationship reversible, and the bounded-retry orchestration that keeps
//! the whole thing resumable after partial failure.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per module; `anyhow::Result` only
//!   at the db/CLI boundary. Stable machine codes live in [`error`].
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).
//! - **Actors**: every mutating operation takes an explicit `actor` name.
//!   There is no ambient current-user context.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod lock;
pub mod model;
pub mod mover;
pub mod processor;
pub mod retry;
pub mod store;
pub mod undo;
