//! Core types for the tindex scoring pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: task definitions, daily log entries, streak state, and the score
//! series emitted to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Identifier of a coached task.
///
/// The known variants cover the shipped catalog; `Other` keeps old log data
/// readable when the catalog evolves. Entries whose id has no catalog
/// definition are skipped by every computation, never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    SunExposure,
    Exercise,
    Sleep,
    Meals,
    Supplements,
    Alcohol,
    Stress,
    Abstinence,
    /// For retired or not-yet-shipped tasks
    #[serde(untagged)]
    Other(String),
}

impl TaskId {
    pub fn as_str(&self) -> &str {
        match self {
            TaskId::SunExposure => "sun_exposure",
            TaskId::Exercise => "exercise",
            TaskId::Sleep => "sleep",
            TaskId::Meals => "meals",
            TaskId::Supplements => "supplements",
            TaskId::Alcohol => "alcohol",
            TaskId::Stress => "stress",
            TaskId::Abstinence => "abstinence",
            TaskId::Other(name) => name.as_str(),
        }
    }
}

/// How a task is logged and how its progress maps onto the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Done-or-not task logged as a completion percentage
    Simple,
    /// Quantity task logged against a daily goal
    Slider,
    /// Sleep-specific slider with a non-linear hours curve
    SleepSlider,
    /// Fixed list of items checked off during the day
    Checklist { item_count: u32 },
    /// Signed meal-quality entries accumulated through the day
    MealLog,
}

/// Whether performing the task helps or hurts the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Positive-framed: doing it contributes positively
    Do,
    /// Inverted: avoiding it contributes positively, any reported level penalizes
    Dont,
}

/// Static definition of one catalog task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub kind: BehaviorKind,
    pub polarity: Polarity,
    /// Daily goal in the task's native unit (minutes, hours, items, ...)
    pub goal: f64,
    /// Upper bound of the task's input control
    pub max_value: f64,
    /// Input control increment
    pub step: f64,
    /// Relative contribution magnitude used to normalize across tasks
    pub impact_weight: f64,
    /// A "do" that can also pull the score down (sleep, meals); counted in
    /// the negative normalization pool alongside the "don'ts"
    pub dual_direction: bool,
}

impl TaskDefinition {
    /// Whether this definition participates in the negative normalization pool
    pub fn counts_negative(&self) -> bool {
        self.polarity == Polarity::Dont || self.dual_direction
    }
}

/// One meal logged during a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    /// Stable id, required for single-entry deletion
    pub id: Uuid,
    /// Meal quality score, 0-100
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// One (task, calendar day) log record.
///
/// Upsert semantics: a second log for the same task on the same day updates
/// this entry in place; meal logs append to `history` and recompute
/// `raw_progress` as the sum of signed history contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    pub task: TaskId,
    pub date: NaiveDate,
    /// Percentage of goal/max, 0-100; signed for meal logs
    pub raw_progress: f64,
    /// Checklist tasks only: indices of checked items
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub checked_items: BTreeSet<u32>,
    /// Meal-log tasks only: the day's individual meals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<MealEntry>,
}

impl TaskLogEntry {
    /// A bare entry with no progress yet
    pub fn new(task: TaskId, date: NaiveDate) -> Self {
        Self {
            task,
            date,
            raw_progress: 0.0,
            checked_items: BTreeSet::new(),
            history: Vec::new(),
        }
    }
}

/// Cached streak state for one task.
///
/// Derived state: must always equal what a full recompute over the task log
/// would produce. The cache exists so the write path can answer "did this
/// update extend the streak" without a second pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    /// Consecutive qualifying days ending today or yesterday
    pub count: u32,
    /// Day the cache was last written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<NaiveDate>,
    /// Day a streak notification was last surfaced for this task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notified: Option<NaiveDate>,
}

/// One point of the smoothed daily score series. Output only, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    /// Days since program start (0 = start date)
    pub day_index: u32,
    /// Clamped, smoothed score estimate for that day
    pub smoothed_value: f64,
}

/// Flags raised while aggregating the task log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// A log entry referenced a task id with no catalog definition
    UnknownTask,
    /// A log entry carried a non-finite progress value and was skipped
    MalformedEntry,
    /// The task log was empty; the series is baseline-only
    EmptyLog,
}

/// Data-quality block attached to every stats snapshot.
///
/// The engine never logs; skipped data is reported here so callers can
/// degrade the display ("no data yet") instead of rendering a partial chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotQuality {
    pub entries_seen: usize,
    pub entries_skipped: usize,
    pub flags: Vec<QualityFlag>,
}

/// Per-task streak as reported to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub task: TaskId,
    pub count: u32,
}

/// One ranked "key factor" row: a task and its overall pull on the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFactor {
    pub task: TaskId,
    /// Current streak, 0 when not streaking
    pub streak: u32,
    /// Sum of this task's daily contributions over the whole program
    pub total_impact: f64,
}
