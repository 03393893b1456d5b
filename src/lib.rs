//! tindex - On-device scoring engine for testosterone-optimization habit coaching
//!
//! tindex turns a user's daily task log into a smoothed, bounded score trend
//! through a deterministic pipeline: catalog lookup → contribution
//! calculation → timeline aggregation → streak and achievement evaluation.
//!
//! ## Modules
//!
//! - **Read path**: `compute_statistics` builds the full statistics snapshot
//!   (score series, streaks, key factors, tier) for one program
//! - **Write path**: `apply_task_update` applies one task log update and
//!   returns the refreshed snapshot plus streak/achievement outcomes
//!
//! Both the mobile client (via FFI) and the backend call the same functions;
//! the scoring rules exist exactly once.

pub mod achievements;
pub mod catalog;
pub mod contribution;
pub mod error;
pub mod pipeline;
pub mod program;
pub mod request;
pub mod store;
pub mod streak;
pub mod tier;
pub mod timeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::EngineError;
pub use pipeline::{
    apply_task_update, compute_statistics, ScoreEngine, StatsSnapshot, TaskUpdateOutcome,
};
pub use program::UserProgram;
pub use request::{RequestAdapter, TaskUpdateRequest, UpdateKind, SCHEMA_VERSION};
pub use store::{JsonFileStore, MemoryStore, ProgramStore};

/// Engine version embedded in all stats snapshots
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for stats snapshots
pub const PRODUCER_NAME: &str = "tindex";
