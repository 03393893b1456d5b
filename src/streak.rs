//! Streak evaluation
//!
//! A streak is the count of consecutive calendar days a task's qualifying
//! condition held, ending today or yesterday. One qualifying predicate per
//! task serves both the full-log recompute and the did-this-update-qualify
//! check, so the cached streak map can never drift from a recompute.

use crate::catalog;
use crate::program::UserProgram;
use crate::types::{BehaviorKind, Polarity, StreakState, TaskDefinition, TaskId, TaskLogEntry};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Sleep qualifies at 7 of 8 goal hours.
pub const SLEEP_QUALIFYING_PROGRESS: f64 = 87.5;
/// A meal with at least this score makes the day count for the diet streak.
pub const QUALIFYING_MEAL_SCORE: f64 = 75.0;

/// Streak evaluator over one task's log entries.
pub struct StreakEvaluator;

impl StreakEvaluator {
    /// Whether a day's entry counts as a success for streak purposes.
    pub fn qualifies(def: &TaskDefinition, entry: &TaskLogEntry) -> bool {
        match (def.kind, def.polarity) {
            (BehaviorKind::Simple, Polarity::Do) => entry.raw_progress > 0.0,
            (BehaviorKind::Simple, Polarity::Dont) => entry.raw_progress < 50.0,
            (BehaviorKind::Slider, Polarity::Do) => entry.raw_progress >= 100.0,
            (BehaviorKind::Slider, Polarity::Dont) => {
                let level = entry.raw_progress / 100.0 * def.max_value;
                // A zero goal means total avoidance is the bar
                if def.goal > 0.0 {
                    level < def.goal
                } else {
                    level <= 0.0
                }
            }
            (BehaviorKind::SleepSlider, _) => entry.raw_progress >= SLEEP_QUALIFYING_PROGRESS,
            (BehaviorKind::Checklist { item_count }, _) => {
                item_count > 0 && entry.checked_items.len() as u32 >= item_count
            }
            (BehaviorKind::MealLog, _) => entry
                .history
                .iter()
                .any(|meal| meal.score >= QUALIFYING_MEAL_SCORE),
        }
    }

    /// Current streak over a task's full log.
    ///
    /// Qualifying days are deduplicated and walked newest-first; the streak
    /// is broken unless the newest qualifying day is today or yesterday, and
    /// stops at the first gap wider than one day.
    pub fn current_streak<'a>(
        def: &TaskDefinition,
        entries: impl Iterator<Item = &'a TaskLogEntry>,
        today: NaiveDate,
    ) -> u32 {
        let days: BTreeSet<NaiveDate> = entries
            .filter(|entry| Self::qualifies(def, entry))
            .map(|entry| entry.date)
            .collect();

        let mut newest_first = days.into_iter().rev();
        let Some(most_recent) = newest_first.next() else {
            return 0;
        };
        if (today - most_recent).num_days() > 1 {
            return 0;
        }

        let mut streak = 1;
        let mut cursor = most_recent;
        for date in newest_first {
            if (cursor - date).num_days() == 1 {
                streak += 1;
                cursor = date;
            } else {
                break;
            }
        }
        streak
    }

    /// Convenience: streak for one task straight from a program snapshot.
    /// Unknown task ids have no qualifying predicate and no streak.
    pub fn streak_for_task(program: &UserProgram, task: &TaskId, today: NaiveDate) -> u32 {
        match catalog::definition_of(task) {
            Some(def) => Self::current_streak(def, program.entries_for(task), today),
            None => 0,
        }
    }

    /// Whether a streak notification should surface for this update.
    ///
    /// Qualifying update, live streak, and nothing already sent today.
    pub fn notification_due(
        state: &StreakState,
        qualified: bool,
        streak: u32,
        today: NaiveDate,
    ) -> bool {
        qualified && streak > 0 && state.last_notified != Some(today)
    }
}
