//! Achievement evaluation
//!
//! A static catalog of unlock criteria evaluated against aggregate program
//! statistics. Unlocks are append-only: once an id is in the unlocked set it
//! stays there, even if the aggregates later regress.

use crate::catalog;
use crate::program::UserProgram;
use crate::streak::StreakEvaluator;
use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Condition under which an achievement unlocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockCriterion {
    /// The first qualifying log of any task, ever
    FirstQualifyingTask,
    /// Today's score gain reached this many points
    DailyScoreDeltaAtLeast(f64),
    /// The current score reached this value
    AbsoluteScoreAtLeast(f64),
    /// A task accumulated this many distinct qualifying days
    DistinctQualifyingDaysForTask { task: TaskId, days: u32 },
    /// Lifetime sun-exposure minutes reached this value
    TotalSunMinutesAtLeast(f64),
}

/// Static definition of one achievement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub criterion: UnlockCriterion,
}

/// The shipped achievement catalog.
static ACHIEVEMENTS: [AchievementDefinition; 11] = [
    AchievementDefinition {
        id: "first_win",
        title: "First Win",
        criterion: UnlockCriterion::FirstQualifyingTask,
    },
    AchievementDefinition {
        id: "workout_week",
        title: "Workout Week",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Exercise,
            days: 7,
        },
    },
    AchievementDefinition {
        id: "iron_month",
        title: "Iron Month",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Exercise,
            days: 30,
        },
    },
    AchievementDefinition {
        id: "solar_powered",
        title: "Solar Powered",
        criterion: UnlockCriterion::TotalSunMinutesAtLeast(500.0),
    },
    AchievementDefinition {
        id: "well_rested",
        title: "Well Rested",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Sleep,
            days: 14,
        },
    },
    AchievementDefinition {
        id: "clean_plate",
        title: "Clean Plate",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Meals,
            days: 30,
        },
    },
    AchievementDefinition {
        id: "fully_stacked",
        title: "Fully Stacked",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Supplements,
            days: 21,
        },
    },
    AchievementDefinition {
        id: "dry_month",
        title: "Dry Month",
        criterion: UnlockCriterion::DistinctQualifyingDaysForTask {
            task: TaskId::Alcohol,
            days: 30,
        },
    },
    AchievementDefinition {
        id: "breaking_600",
        title: "Breaking 600",
        criterion: UnlockCriterion::AbsoluteScoreAtLeast(600.0),
    },
    AchievementDefinition {
        id: "peak_form",
        title: "Peak Form",
        criterion: UnlockCriterion::AbsoluteScoreAtLeast(900.0),
    },
    AchievementDefinition {
        id: "big_day",
        title: "Big Day",
        criterion: UnlockCriterion::DailyScoreDeltaAtLeast(5.0),
    },
];

/// All achievement definitions, in display order.
pub fn all_achievements() -> &'static [AchievementDefinition] {
    &ACHIEVEMENTS
}

/// Aggregate statistics the criteria are evaluated against.
///
/// Built once per evaluation from the program snapshot plus the caller's
/// score figures; the evaluation itself never touches the task log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementInputs {
    /// Distinct qualifying days per task id
    pub qualifying_days: BTreeMap<String, u32>,
    /// Lifetime sun minutes across days with positive progress
    pub total_sun_minutes: f64,
    pub current_score: i64,
    /// Today's score gain, supplied by the caller
    pub daily_score_delta: f64,
}

impl AchievementInputs {
    /// Build the aggregate bundle from a program snapshot.
    pub fn from_program(program: &UserProgram, current_score: i64, daily_score_delta: f64) -> Self {
        let mut qualifying_days = BTreeMap::new();
        for def in catalog::all_definitions() {
            let days: BTreeSet<_> = program
                .entries_for(&def.id)
                .filter(|entry| StreakEvaluator::qualifies(def, entry))
                .map(|entry| entry.date)
                .collect();
            qualifying_days.insert(def.id.as_str().to_string(), days.len() as u32);
        }

        let sun_goal = catalog::definition_of(&TaskId::SunExposure)
            .map(|def| def.goal)
            .unwrap_or(0.0);
        let total_sun_minutes = program
            .entries_for(&TaskId::SunExposure)
            .filter(|entry| entry.raw_progress > 0.0 && entry.raw_progress.is_finite())
            .map(|entry| entry.raw_progress / 100.0 * sun_goal)
            .sum();

        Self {
            qualifying_days,
            total_sun_minutes,
            current_score,
            daily_score_delta,
        }
    }

    pub fn exercise_days(&self) -> u32 {
        self.days_for(&TaskId::Exercise)
    }

    pub fn sleep_days(&self) -> u32 {
        self.days_for(&TaskId::Sleep)
    }

    pub fn diet_days(&self) -> u32 {
        self.days_for(&TaskId::Meals)
    }

    pub fn supplementation_days(&self) -> u32 {
        self.days_for(&TaskId::Supplements)
    }

    fn days_for(&self, task: &TaskId) -> u32 {
        self.qualifying_days.get(task.as_str()).copied().unwrap_or(0)
    }

    fn any_qualifying_day(&self) -> bool {
        self.qualifying_days.values().any(|days| *days > 0)
    }
}

/// Achievement evaluator.
pub struct AchievementEvaluator;

impl AchievementEvaluator {
    /// Definitions newly satisfied by `inputs` and not yet unlocked.
    ///
    /// The caller appends the returned ids to the unlocked set; nothing is
    /// ever removed from it.
    pub fn newly_unlocked(
        inputs: &AchievementInputs,
        unlocked: &BTreeSet<String>,
    ) -> Vec<&'static AchievementDefinition> {
        ACHIEVEMENTS
            .iter()
            .filter(|def| !unlocked.contains(def.id))
            .filter(|def| Self::satisfied(&def.criterion, inputs))
            .collect()
    }

    fn satisfied(criterion: &UnlockCriterion, inputs: &AchievementInputs) -> bool {
        match criterion {
            UnlockCriterion::FirstQualifyingTask => inputs.any_qualifying_day(),
            UnlockCriterion::DailyScoreDeltaAtLeast(delta) => inputs.daily_score_delta >= *delta,
            UnlockCriterion::AbsoluteScoreAtLeast(score) => inputs.current_score as f64 >= *score,
            UnlockCriterion::DistinctQualifyingDaysForTask { task, days } => {
                inputs.days_for(task) >= *days
            }
            UnlockCriterion::TotalSunMinutesAtLeast(minutes) => {
                inputs.total_sun_minutes >= *minutes
            }
        }
    }
}
