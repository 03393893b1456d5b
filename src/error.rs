//! Error types for the tindex engine

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can surface from the engine or its collaborators.
///
/// Catalog lookup misses and malformed log entries are deliberately absent:
/// the scoring pipeline skips that data and reports it through the snapshot
/// quality block instead of failing the computation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown user: {0}")]
    UserNotFound(String),

    #[error("No log entry for task '{task}' on {date}")]
    EntryNotFound { task: String, date: NaiveDate },

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}
