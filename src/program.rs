//! User program state
//!
//! A `UserProgram` is the whole persisted document for one user: baseline,
//! start date, task log, cached streaks, and unlocked achievements. The
//! engine receives a full snapshot, mutates it, and hands it back; the
//! persistence collaborator writes the whole document at once. Two
//! concurrent updates to the same program are last-write-wins on the whole
//! document.

use crate::error::EngineError;
use crate::types::{MealEntry, StreakState, TaskId, TaskLogEntry};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Baseline score assigned at account creation when onboarding produced none.
pub const DEFAULT_BASELINE_SCORE: f64 = 290.0;

/// Full per-user state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgram {
    pub user_id: String,
    /// Estimated score at program start; fixed at account creation
    pub baseline_score: f64,
    /// Day index 0 of every score series; immutable after creation
    pub start_date: NaiveDate,
    /// One entry per (task, calendar day)
    #[serde(default)]
    pub task_log: Vec<TaskLogEntry>,
    /// Cached per-task streaks; always recomputable from `task_log`
    #[serde(default)]
    pub streaks: BTreeMap<String, StreakState>,
    /// Append-only set of unlocked achievement ids
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<String>,
}

impl UserProgram {
    /// New program with the default onboarding baseline.
    pub fn new(user_id: impl Into<String>, start_date: NaiveDate) -> Self {
        Self::with_baseline(user_id, start_date, DEFAULT_BASELINE_SCORE)
    }

    /// New program with an explicit onboarding estimate.
    pub fn with_baseline(
        user_id: impl Into<String>,
        start_date: NaiveDate,
        baseline_score: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            baseline_score,
            start_date,
            task_log: Vec::new(),
            streaks: BTreeMap::new(),
            unlocked_achievements: BTreeSet::new(),
        }
    }

    /// The log entry for (task, date), if one exists.
    pub fn entry(&self, task: &TaskId, date: NaiveDate) -> Option<&TaskLogEntry> {
        self.task_log
            .iter()
            .find(|e| &e.task == task && e.date == date)
    }

    /// All entries for one task, in log order.
    pub fn entries_for<'a>(&'a self, task: &'a TaskId) -> impl Iterator<Item = &'a TaskLogEntry> {
        self.task_log.iter().filter(move |e| &e.task == task)
    }

    /// Cached streak state for a task (default when never written).
    pub fn streak_state(&self, task: &TaskId) -> StreakState {
        self.streaks
            .get(task.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Write the streak cache for a task.
    pub fn set_streak_state(&mut self, task: &TaskId, state: StreakState) {
        self.streaks.insert(task.as_str().to_string(), state);
    }

    fn entry_mut_or_insert(&mut self, task: TaskId, date: NaiveDate) -> &mut TaskLogEntry {
        if let Some(idx) = self
            .task_log
            .iter()
            .position(|e| e.task == task && e.date == date)
        {
            return &mut self.task_log[idx];
        }
        self.task_log.push(TaskLogEntry::new(task, date));
        self.task_log.last_mut().expect("entry just pushed")
    }

    /// Upsert a progress-style log (simple, slider, sleep).
    ///
    /// A second log for the same day replaces the stored progress; exactly
    /// one entry per (task, day) survives.
    pub fn upsert_progress(&mut self, task: TaskId, date: NaiveDate, raw_progress: f64) {
        let entry = self.entry_mut_or_insert(task, date);
        entry.raw_progress = raw_progress;
    }

    /// Upsert a checklist log, replacing the day's checked set.
    pub fn upsert_checklist(&mut self, task: TaskId, date: NaiveDate, checked: BTreeSet<u32>) {
        let entry = self.entry_mut_or_insert(task, date);
        entry.checked_items = checked;
        entry.raw_progress = 0.0;
    }

    /// Append one meal to the day's meal log and refresh the signed total.
    ///
    /// Returns the new entry's id so a caller can later delete exactly it.
    pub fn append_meal(
        &mut self,
        date: NaiveDate,
        score: f64,
        note: Option<String>,
        logged_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let entry = self.entry_mut_or_insert(TaskId::Meals, date);
        entry.history.push(MealEntry {
            id,
            score,
            note,
            logged_at,
        });
        entry.raw_progress = meal_raw_progress(&entry.history);
        id
    }

    /// Delete a single meal-history item by id.
    ///
    /// Removing the last meal of a day removes the day's entry entirely.
    pub fn delete_meal(&mut self, date: NaiveDate, meal_id: Uuid) -> Result<(), EngineError> {
        let Some(idx) = self
            .task_log
            .iter()
            .position(|e| e.task == TaskId::Meals && e.date == date)
        else {
            return Err(EngineError::EntryNotFound {
                task: TaskId::Meals.as_str().to_string(),
                date,
            });
        };

        {
            let entry = &mut self.task_log[idx];
            let before = entry.history.len();
            entry.history.retain(|m| m.id != meal_id);
            if entry.history.len() == before {
                return Err(EngineError::EntryNotFound {
                    task: TaskId::Meals.as_str().to_string(),
                    date,
                });
            }
            if !entry.history.is_empty() {
                entry.raw_progress = meal_raw_progress(&entry.history);
                return Ok(());
            }
        }

        // Last meal of the day removed: drop the day's entry entirely
        self.task_log.remove(idx);
        Ok(())
    }

    /// Load a program document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the program document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Signed value of one meal: a score under 50 counts as `-(100 - score)`,
/// anything else counts as the score itself.
pub fn signed_meal_value(score: f64) -> f64 {
    if score < 50.0 {
        -(100.0 - score)
    } else {
        score
    }
}

/// A day's meal `raw_progress`: the sum of signed history values.
pub fn meal_raw_progress(history: &[MealEntry]) -> f64 {
    history.iter().map(|m| signed_meal_value(m.score)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_progress_upsert_keeps_one_entry_per_day() {
        let mut program = UserProgram::new("u1", start());
        program.upsert_progress(TaskId::Exercise, start(), 50.0);
        program.upsert_progress(TaskId::Exercise, start(), 100.0);

        assert_eq!(program.task_log.len(), 1);
        assert_eq!(program.entry(&TaskId::Exercise, start()).unwrap().raw_progress, 100.0);

        // A different day gets its own entry
        let next = start().succ_opt().unwrap();
        program.upsert_progress(TaskId::Exercise, next, 100.0);
        assert_eq!(program.task_log.len(), 2);
    }

    #[test]
    fn test_meal_upsert_sums_signed_history() {
        let mut program = UserProgram::new("u1", start());
        let now = Utc::now();
        program.append_meal(start(), 80.0, None, now);
        program.append_meal(start(), 30.0, Some("late pizza".to_string()), now);

        let entry = program.entry(&TaskId::Meals, start()).unwrap();
        assert_eq!(entry.history.len(), 2);
        // 80 + (-(100 - 30)) = 10
        assert_eq!(entry.raw_progress, 10.0);
    }

    #[test]
    fn test_delete_single_meal() {
        let mut program = UserProgram::new("u1", start());
        let now = Utc::now();
        let keep = program.append_meal(start(), 80.0, None, now);
        let drop = program.append_meal(start(), 30.0, None, now);

        program.delete_meal(start(), drop).unwrap();
        let entry = program.entry(&TaskId::Meals, start()).unwrap();
        assert_eq!(entry.history.len(), 1);
        assert_eq!(entry.history[0].id, keep);
        assert_eq!(entry.raw_progress, 80.0);

        // Deleting the last meal removes the day's entry
        program.delete_meal(start(), keep).unwrap();
        assert!(program.entry(&TaskId::Meals, start()).is_none());
    }

    #[test]
    fn test_delete_missing_meal_is_not_found() {
        let mut program = UserProgram::new("u1", start());
        let err = program.delete_meal(start(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::EntryNotFound { .. }));

        program.append_meal(start(), 80.0, None, Utc::now());
        let err = program.delete_meal(start(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::EntryNotFound { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let mut program = UserProgram::with_baseline("u1", start(), 310.0);
        program.upsert_progress(TaskId::Sleep, start(), 87.5);
        program.append_meal(start(), 90.0, Some("steak and eggs".to_string()), Utc::now());
        program.set_streak_state(
            &TaskId::Sleep,
            StreakState {
                count: 3,
                last_update: Some(start()),
                last_notified: None,
            },
        );
        program.unlocked_achievements.insert("first_win".to_string());

        let json = program.to_json().unwrap();
        let loaded = UserProgram::from_json(&json).unwrap();
        assert_eq!(program, loaded);
    }

    #[test]
    fn test_signed_meal_value_threshold() {
        assert_eq!(signed_meal_value(50.0), 50.0);
        assert_eq!(signed_meal_value(49.0), -51.0);
        assert_eq!(signed_meal_value(100.0), 100.0);
        assert_eq!(signed_meal_value(0.0), -100.0);
    }
}
