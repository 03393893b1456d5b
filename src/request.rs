//! tindex.task_update.v1 schema
//!
//! The versioned input shape for task-update requests, with validation and
//! batch parse helpers. Validation rejects only structurally nonsensical
//! input; out-of-range-but-finite numbers are left to the scoring pipeline,
//! which clamps rather than rejects.

use crate::catalog;
use crate::error::EngineError;
use crate::types::{BehaviorKind, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Current input schema version
pub const SCHEMA_VERSION: &str = "tindex.task_update.v1";

/// Upper sanity bound for progress values; the sun slider legitimately
/// reaches 400% of goal, anything past this is malformed input.
const MAX_RAW_PROGRESS: f64 = 500.0;

/// The logged change carried by a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum UpdateKind {
    /// Progress-style log for simple, slider, and sleep tasks
    Progress { raw_progress: f64 },
    /// Replace the day's checked set for a checklist task
    Checklist { checked_items: BTreeSet<u32> },
    /// Append one meal to the day's meal log
    Meal {
        score: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// Remove one previously logged meal by id
    DeleteMeal { meal_id: Uuid },
}

/// One task-update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdateRequest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub user_id: String,
    /// Calendar day the log applies to
    pub date: NaiveDate,
    pub task: TaskId,
    pub update: UpdateKind,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl TaskUpdateRequest {
    /// Validate the request shape.
    ///
    /// Unknown task ids pass validation (the pipeline skips them silently),
    /// but an update whose kind contradicts a known definition is rejected.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(EngineError::InvalidRequest(format!(
                "unsupported schema version '{}'",
                self.schema_version
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(EngineError::InvalidRequest("empty user_id".to_string()));
        }

        match &self.update {
            UpdateKind::Progress { raw_progress } => {
                if !raw_progress.is_finite() || !(0.0..=MAX_RAW_PROGRESS).contains(raw_progress) {
                    return Err(EngineError::InvalidRequest(format!(
                        "raw_progress {raw_progress} out of range"
                    )));
                }
            }
            UpdateKind::Checklist { checked_items } => {
                if let Some(def) = catalog::definition_of(&self.task) {
                    if let BehaviorKind::Checklist { item_count } = def.kind {
                        if let Some(bad) = checked_items.iter().find(|i| **i >= item_count) {
                            return Err(EngineError::InvalidRequest(format!(
                                "checked item {bad} outside checklist of {item_count}"
                            )));
                        }
                    }
                }
            }
            UpdateKind::Meal { score, .. } => {
                if !score.is_finite() || !(0.0..=100.0).contains(score) {
                    return Err(EngineError::InvalidRequest(format!(
                        "meal score {score} out of range"
                    )));
                }
            }
            UpdateKind::DeleteMeal { .. } => {}
        }

        if let Some(def) = catalog::definition_of(&self.task) {
            let compatible = matches!(
                (&def.kind, &self.update),
                (
                    BehaviorKind::Simple | BehaviorKind::Slider | BehaviorKind::SleepSlider,
                    UpdateKind::Progress { .. }
                ) | (BehaviorKind::Checklist { .. }, UpdateKind::Checklist { .. })
                    | (
                        BehaviorKind::MealLog,
                        UpdateKind::Meal { .. } | UpdateKind::DeleteMeal { .. }
                    )
            );
            if !compatible {
                return Err(EngineError::InvalidRequest(format!(
                    "update type does not match task '{}'",
                    self.task.as_str()
                )));
            }
        }

        Ok(())
    }
}

/// Parse and batch-validate helpers for request streams.
pub struct RequestAdapter;

/// One failed request in a batch validation report.
#[derive(Debug, Clone, Serialize)]
pub struct RequestFailure {
    pub index: usize,
    pub user_id: Option<String>,
    pub error: String,
}

impl RequestAdapter {
    /// Parse newline-delimited JSON, one request per line.
    pub fn parse_ndjson(input: &str) -> Result<Vec<TaskUpdateRequest>, EngineError> {
        let mut requests = Vec::new();
        for line in input.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            requests.push(serde_json::from_str(trimmed)?);
        }
        Ok(requests)
    }

    /// Parse a JSON array of requests.
    pub fn parse_array(input: &str) -> Result<Vec<TaskUpdateRequest>, EngineError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Validate every request, collecting failures.
    pub fn validate_all(requests: &[TaskUpdateRequest]) -> Vec<RequestFailure> {
        requests
            .iter()
            .enumerate()
            .filter_map(|(index, request)| {
                request.validate().err().map(|error| RequestFailure {
                    index,
                    user_id: Some(request.user_id.clone()),
                    error: error.to_string(),
                })
            })
            .collect()
    }
}
