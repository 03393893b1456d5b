//! Contribution calculation
//!
//! Converts one (task definition, log entry) pair into the day's signed
//! contribution toward the score, before normalization. Pure: no side
//! effects, no clock, no catalog access.

use crate::types::{BehaviorKind, Polarity, TaskDefinition, TaskLogEntry};

/// Contribution calculator for a single day's log entry.
pub struct ContributionCalculator;

impl ContributionCalculator {
    /// Signed contribution of `entry` under `def`, before normalization.
    pub fn contribution(def: &TaskDefinition, entry: &TaskLogEntry) -> f64 {
        match def.kind {
            BehaviorKind::Simple => simple_contribution(def, entry.raw_progress),
            BehaviorKind::Slider => slider_contribution(def, entry.raw_progress),
            BehaviorKind::SleepSlider => sleep_contribution(def, entry.raw_progress),
            BehaviorKind::MealLog => meal_contribution(def, entry.raw_progress),
            BehaviorKind::Checklist { item_count } => {
                checklist_contribution(def, entry, item_count)
            }
        }
    }
}

/// Done-or-not tasks: straight fraction of the impact weight, sign by polarity.
fn simple_contribution(def: &TaskDefinition, raw_progress: f64) -> f64 {
    let fraction = raw_progress / 100.0;
    match def.polarity {
        Polarity::Do => fraction * def.impact_weight,
        Polarity::Dont => -fraction * def.impact_weight,
    }
}

/// Quantity tasks. Non-inverted sliders cap overperformance credit at 2x the
/// goal; inverted sliders penalize proportionally with no cap, so any
/// reported level costs something.
fn slider_contribution(def: &TaskDefinition, raw_progress: f64) -> f64 {
    match def.polarity {
        Polarity::Do => {
            if def.goal <= 0.0 {
                return 0.0;
            }
            let actual = (raw_progress / 100.0) * def.goal;
            let multiplier = (actual / def.goal).min(2.0);
            multiplier * def.impact_weight
        }
        Polarity::Dont => -(raw_progress / 100.0) * def.impact_weight,
    }
}

/// Sleep: a non-linear curve over hours slept rather than a straight fraction.
fn sleep_contribution(def: &TaskDefinition, raw_progress: f64) -> f64 {
    let hours_slept = (raw_progress / 100.0) * def.goal;
    sleep_multiplier(hours_slept) * def.impact_weight
}

/// The sleep curve.
///
/// Below 7 hours the penalty ramps to -1 at 4 hours; [7, 8) is neutral;
/// above 8 hours the reward ramps to +1 at 10 hours. Both ends clamp.
pub fn sleep_multiplier(hours_slept: f64) -> f64 {
    if hours_slept < 7.0 {
        -(((7.0 - hours_slept) / 3.0).min(1.0))
    } else if hours_slept < 8.0 {
        0.0
    } else {
        ((hours_slept - 8.0) / 2.0).min(1.0)
    }
}

/// Meal logs: `raw_progress` is already the signed sum of the day's meal
/// values, so the fraction carries the sign through.
fn meal_contribution(def: &TaskDefinition, raw_progress: f64) -> f64 {
    (raw_progress / 100.0) * def.impact_weight
}

/// Checklists behave like a simple task at the checked-item ratio.
fn checklist_contribution(def: &TaskDefinition, entry: &TaskLogEntry, item_count: u32) -> f64 {
    if item_count == 0 {
        return 0.0;
    }
    let raw = 100.0 * (entry.checked_items.len() as f64) / (item_count as f64);
    (raw / 100.0) * def.impact_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::definition_of;
    use crate::types::TaskId;
    use chrono::NaiveDate;

    fn entry_with_progress(task: TaskId, raw_progress: f64) -> TaskLogEntry {
        let mut entry = TaskLogEntry::new(task, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        entry.raw_progress = raw_progress;
        entry
    }

    #[test]
    fn test_simple_task_scales_linearly() {
        let def = definition_of(&TaskId::Exercise).unwrap();
        let entry = entry_with_progress(TaskId::Exercise, 100.0);
        assert_eq!(ContributionCalculator::contribution(def, &entry), 30.0);

        let half = entry_with_progress(TaskId::Exercise, 50.0);
        assert_eq!(ContributionCalculator::contribution(def, &half), 15.0);
    }

    #[test]
    fn test_simple_inverted_penalizes() {
        let def = definition_of(&TaskId::Abstinence).unwrap();
        let entry = entry_with_progress(TaskId::Abstinence, 100.0);
        assert_eq!(ContributionCalculator::contribution(def, &entry), -30.0);
    }

    #[test]
    fn test_slider_caps_overperformance_at_double() {
        let def = definition_of(&TaskId::SunExposure).unwrap();

        // 100% of a 30-minute goal
        let at_goal = entry_with_progress(TaskId::SunExposure, 100.0);
        assert_eq!(ContributionCalculator::contribution(def, &at_goal), 15.0);

        // 300% of goal caps at 2x credit
        let way_over = entry_with_progress(TaskId::SunExposure, 300.0);
        assert_eq!(ContributionCalculator::contribution(def, &way_over), 30.0);
    }

    #[test]
    fn test_inverted_slider_has_no_cap() {
        let def = definition_of(&TaskId::Alcohol).unwrap();
        let entry = entry_with_progress(TaskId::Alcohol, 100.0);
        assert_eq!(ContributionCalculator::contribution(def, &entry), -40.0);

        // Beyond the control's nominal range still penalizes proportionally
        let beyond = entry_with_progress(TaskId::Alcohol, 150.0);
        assert_eq!(ContributionCalculator::contribution(def, &beyond), -60.0);
    }

    #[test]
    fn test_sleep_curve_boundaries() {
        assert_eq!(sleep_multiplier(7.0), 0.0);
        assert!((sleep_multiplier(7.9) - 0.0).abs() < f64::EPSILON);
        assert_eq!(sleep_multiplier(8.0), 0.0);
        assert_eq!(sleep_multiplier(4.0), -1.0);
        assert_eq!(sleep_multiplier(10.0), 1.0);
        // Clamped, not extrapolated
        assert_eq!(sleep_multiplier(2.0), -1.0);
        assert_eq!(sleep_multiplier(12.0), 1.0);
        // Midpoints of the ramps
        assert!((sleep_multiplier(5.5) - (-0.5)).abs() < 1e-9);
        assert!((sleep_multiplier(9.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sleep_contribution_uses_goal_hours() {
        let def = definition_of(&TaskId::Sleep).unwrap();
        // 100% of the 8-hour goal sits in the neutral band
        let at_goal = entry_with_progress(TaskId::Sleep, 100.0);
        assert_eq!(ContributionCalculator::contribution(def, &at_goal), 0.0);

        // 50% progress = 4 hours = full penalty
        let short = entry_with_progress(TaskId::Sleep, 50.0);
        assert_eq!(ContributionCalculator::contribution(def, &short), -25.0);

        // 125% progress = 10 hours = full reward
        let long = entry_with_progress(TaskId::Sleep, 125.0);
        assert_eq!(ContributionCalculator::contribution(def, &long), 25.0);
    }

    #[test]
    fn test_meal_log_sign_carries_through() {
        let def = definition_of(&TaskId::Meals).unwrap();

        let good = entry_with_progress(TaskId::Meals, 80.0);
        assert!((ContributionCalculator::contribution(def, &good) - 28.0).abs() < 1e-9);

        let bad = entry_with_progress(TaskId::Meals, -70.0);
        assert!((ContributionCalculator::contribution(def, &bad) - (-24.5)).abs() < 1e-9);
    }

    #[test]
    fn test_checklist_ratio() {
        let def = definition_of(&TaskId::Supplements).unwrap();
        let mut entry = TaskLogEntry::new(
            TaskId::Supplements,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        entry.checked_items.extend([0, 1]);
        // 2 of 4 items at weight 20
        assert_eq!(ContributionCalculator::contribution(def, &entry), 10.0);

        entry.checked_items.extend([2, 3]);
        assert_eq!(ContributionCalculator::contribution(def, &entry), 20.0);
    }
}
