//! Pipeline orchestration
//!
//! This module provides the public API of the engine: the read path
//! (`compute_statistics`) and the write path (`apply_task_update`), plus the
//! store-backed `ScoreEngine` wrapper. Both the display layer and the
//! persistence layer go through the same functions here; there is no second
//! copy of the scoring rules anywhere.

use crate::achievements::{AchievementEvaluator, AchievementInputs};
use crate::catalog;
use crate::contribution::ContributionCalculator;
use crate::error::EngineError;
use crate::program::UserProgram;
use crate::request::{TaskUpdateRequest, UpdateKind};
use crate::store::ProgramStore;
use crate::streak::StreakEvaluator;
use crate::tier;
use crate::tier::TierStanding;
use crate::timeline::{Timeline, TimelineBuilder};
use crate::types::{
    KeyFactor, Polarity, ScorePoint, SnapshotQuality, StreakState, StreakSummary, TaskId,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current stats output schema version
pub const STATS_SCHEMA_VERSION: &str = "tindex.stats.v1";

/// Engine metadata stamped onto every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Everything the statistics screen needs, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub schema_version: String,
    pub producer: SnapshotProducer,
    pub computed_at_utc: String,
    pub user_id: String,
    /// Rounded current score, from the unsmoothed series tail
    pub current_score: i64,
    /// Display-only trend against the first smoothed point, in percent
    pub trend_pct: f64,
    pub tier: TierStanding,
    /// Smoothed daily series, one point per program day
    pub series: Vec<ScorePoint>,
    /// Per-task streak counts, catalog order
    pub streaks: Vec<StreakSummary>,
    /// Tasks ranked by display priority
    pub key_factors: Vec<KeyFactor>,
    pub quality: SnapshotQuality,
}

/// Result of one task update through the full write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdateOutcome {
    pub task: TaskId,
    /// Streak after this update
    pub streak: u32,
    /// Whether this update's day qualifies for the task
    pub qualified: bool,
    /// Whether a "streak extended" notification should surface now
    pub streak_notification: bool,
    /// Today's score movement against yesterday's value
    pub daily_score_delta: f64,
    /// Achievement ids unlocked by this update
    pub newly_unlocked: Vec<String>,
    pub snapshot: StatsSnapshot,
}

/// Compute the full statistics snapshot for a program as of `today`.
///
/// Pure with respect to the program: recomputing on the same snapshot yields
/// the same series, score, streaks, and factors (only the envelope's
/// computed-at and instance id differ).
pub fn compute_statistics(program: &UserProgram, today: NaiveDate) -> StatsSnapshot {
    let timeline = TimelineBuilder::build(program, today);
    snapshot_from_timeline(program, &timeline, today)
}

fn snapshot_from_timeline(
    program: &UserProgram,
    timeline: &Timeline,
    today: NaiveDate,
) -> StatsSnapshot {
    let streaks: Vec<StreakSummary> = catalog::all_definitions()
        .iter()
        .map(|def| StreakSummary {
            task: def.id.clone(),
            count: StreakEvaluator::current_streak(def, program.entries_for(&def.id), today),
        })
        .collect();

    StatsSnapshot {
        schema_version: STATS_SCHEMA_VERSION.to_string(),
        producer: SnapshotProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: Uuid::new_v4().to_string(),
        },
        computed_at_utc: Utc::now().to_rfc3339(),
        user_id: program.user_id.clone(),
        current_score: timeline.current_score,
        trend_pct: timeline.trend_pct,
        tier: tier::standing_for(timeline.current_score),
        series: timeline.points.clone(),
        key_factors: rank_key_factors(program, &streaks),
        streaks,
        quality: timeline.quality.clone(),
    }
}

/// Rank tasks for the "key factors" list: active streaks first by streak
/// length, then non-streaking dos by total impact (strongest first), then
/// non-streaking don'ts most-negative first.
fn rank_key_factors(program: &UserProgram, streaks: &[StreakSummary]) -> Vec<KeyFactor> {
    let mut streaking = Vec::new();
    let mut idle_dos = Vec::new();
    let mut idle_donts = Vec::new();

    for def in catalog::all_definitions() {
        let streak = streaks
            .iter()
            .find(|s| s.task == def.id)
            .map(|s| s.count)
            .unwrap_or(0);
        let total_impact: f64 = program
            .entries_for(&def.id)
            .filter(|entry| entry.raw_progress.is_finite())
            .map(|entry| ContributionCalculator::contribution(def, entry))
            .sum();

        let factor = KeyFactor {
            task: def.id.clone(),
            streak,
            total_impact,
        };
        if streak > 0 {
            streaking.push(factor);
        } else if def.polarity == Polarity::Do {
            idle_dos.push(factor);
        } else {
            idle_donts.push(factor);
        }
    }

    streaking.sort_by(|a, b| b.streak.cmp(&a.streak));
    idle_dos.sort_by(|a, b| b.total_impact.total_cmp(&a.total_impact));
    idle_donts.sort_by(|a, b| a.total_impact.total_cmp(&b.total_impact));

    streaking
        .into_iter()
        .chain(idle_dos)
        .chain(idle_donts)
        .collect()
}

/// Apply one task update to a program: upsert the log, refresh the task's
/// streak cache, decide notification eligibility, recompute statistics, and
/// evaluate achievement unlocks.
///
/// Idempotent on the same snapshot except for the append-only unlocked set
/// and the last-notified date, which are intentionally stateful.
pub fn apply_task_update(
    program: &mut UserProgram,
    request: &TaskUpdateRequest,
    today: NaiveDate,
) -> Result<TaskUpdateOutcome, EngineError> {
    request.validate()?;

    match &request.update {
        UpdateKind::Progress { raw_progress } => {
            program.upsert_progress(request.task.clone(), request.date, *raw_progress);
        }
        UpdateKind::Checklist { checked_items } => {
            program.upsert_checklist(request.task.clone(), request.date, checked_items.clone());
        }
        UpdateKind::Meal { score, note } => {
            program.append_meal(request.date, *score, note.clone(), Utc::now());
        }
        UpdateKind::DeleteMeal { meal_id } => {
            program.delete_meal(request.date, *meal_id)?;
        }
    }

    // Streak cache write: recompute from the updated log so the cache can
    // never disagree with a full recompute.
    let streak = StreakEvaluator::streak_for_task(program, &request.task, today);
    let qualified = match (
        catalog::definition_of(&request.task),
        program.entry(&request.task, request.date),
    ) {
        (Some(def), Some(entry)) => StreakEvaluator::qualifies(def, entry),
        _ => false,
    };

    let previous_state = program.streak_state(&request.task);
    let streak_notification =
        StreakEvaluator::notification_due(&previous_state, qualified, streak, today);
    program.set_streak_state(
        &request.task,
        StreakState {
            count: streak,
            last_update: Some(today),
            last_notified: if streak_notification {
                Some(today)
            } else {
                previous_state.last_notified
            },
        },
    );

    let timeline = TimelineBuilder::build(program, today);
    let daily_score_delta = daily_delta(&timeline, program.baseline_score);

    let inputs =
        AchievementInputs::from_program(program, timeline.current_score, daily_score_delta);
    let newly_unlocked: Vec<String> =
        AchievementEvaluator::newly_unlocked(&inputs, &program.unlocked_achievements)
            .iter()
            .map(|def| def.id.to_string())
            .collect();
    program
        .unlocked_achievements
        .extend(newly_unlocked.iter().cloned());

    let snapshot = snapshot_from_timeline(program, &timeline, today);

    Ok(TaskUpdateOutcome {
        task: request.task.clone(),
        streak,
        qualified,
        streak_notification,
        daily_score_delta,
        newly_unlocked,
        snapshot,
    })
}

/// Today's score movement: the raw tail against the previous day's raw
/// value, or against the baseline on the first program day.
fn daily_delta(timeline: &Timeline, baseline_score: f64) -> f64 {
    let last = match timeline.raw_series.last() {
        Some(value) => *value,
        None => return 0.0,
    };
    let previous = if timeline.raw_series.len() >= 2 {
        timeline.raw_series[timeline.raw_series.len() - 2]
    } else {
        baseline_score
    };
    last - previous
}

/// Store-backed engine: one atomic read-modify-write per update request.
///
/// The persistence handle is injected; the engine holds no ambient state.
pub struct ScoreEngine<S: ProgramStore> {
    store: S,
}

impl<S: ProgramStore> ScoreEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read path: the on-demand statistics pull for one user.
    pub fn statistics(&self, user_id: &str) -> Result<StatsSnapshot, EngineError> {
        let program = self.store.load(user_id)?;
        Ok(compute_statistics(&program, Utc::now().date_naive()))
    }

    /// Write path: load, apply, persist, report.
    pub fn handle_update(
        &mut self,
        request: &TaskUpdateRequest,
    ) -> Result<TaskUpdateOutcome, EngineError> {
        let mut program = self.store.load(&request.user_id)?;
        let outcome = apply_task_update(&mut program, request, Utc::now().date_naive())?;
        self.store.save(&program)?;
        Ok(outcome)
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SCHEMA_VERSION;
    use crate::store::MemoryStore;
    use std::collections::BTreeSet;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn day(offset: u64) -> NaiveDate {
        start() + chrono::Days::new(offset)
    }

    fn progress_request(task: TaskId, date: NaiveDate, raw_progress: f64) -> TaskUpdateRequest {
        TaskUpdateRequest {
            schema_version: SCHEMA_VERSION.to_string(),
            user_id: "u1".to_string(),
            date,
            task,
            update: UpdateKind::Progress { raw_progress },
        }
    }

    #[test]
    fn test_update_flow_writes_streak_cache() {
        let mut program = UserProgram::new("u1", start());

        for offset in 0..3 {
            let request = progress_request(TaskId::Exercise, day(offset), 100.0);
            apply_task_update(&mut program, &request, day(offset)).unwrap();
        }

        let outcome = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(3), 100.0),
            day(3),
        )
        .unwrap();
        assert_eq!(outcome.streak, 4);
        assert!(outcome.qualified);
        assert_eq!(program.streak_state(&TaskId::Exercise).count, 4);
    }

    #[test]
    fn test_streak_cache_matches_full_recompute() {
        let mut program = UserProgram::new("u1", start());
        let updates = [
            progress_request(TaskId::Exercise, day(0), 100.0),
            progress_request(TaskId::Sleep, day(0), 90.0),
            progress_request(TaskId::Exercise, day(1), 100.0),
            progress_request(TaskId::Alcohol, day(1), 0.0),
            progress_request(TaskId::Exercise, day(2), 0.0),
            progress_request(TaskId::Sleep, day(2), 87.5),
        ];
        for request in &updates {
            apply_task_update(&mut program, request, day(2)).unwrap();
        }

        for def in catalog::all_definitions() {
            let cached = program.streak_state(&def.id).count;
            let recomputed = StreakEvaluator::streak_for_task(&program, &def.id, day(2));
            if program.entries_for(&def.id).next().is_some() {
                assert_eq!(cached, recomputed, "cache drift for {}", def.id.as_str());
            }
        }
    }

    #[test]
    fn test_notification_fires_once_per_day() {
        let mut program = UserProgram::new("u1", start());

        let first = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(0), 100.0),
            day(0),
        )
        .unwrap();
        assert!(first.streak_notification);

        // Re-logging the same day must not notify again
        let second = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(0), 80.0),
            day(0),
        )
        .unwrap();
        assert!(!second.streak_notification);

        // The next day opens the gate again
        let third = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(1), 100.0),
            day(1),
        )
        .unwrap();
        assert!(third.streak_notification);
    }

    #[test]
    fn test_unlocks_are_appended_and_stay() {
        let mut program = UserProgram::new("u1", start());
        let outcome = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(0), 100.0),
            day(0),
        )
        .unwrap();
        assert!(outcome.newly_unlocked.contains(&"first_win".to_string()));
        assert!(program.unlocked_achievements.contains("first_win"));

        // Subsequent updates never return it again
        let outcome = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(1), 100.0),
            day(1),
        )
        .unwrap();
        assert!(!outcome.newly_unlocked.contains(&"first_win".to_string()));
        assert!(program.unlocked_achievements.contains("first_win"));
    }

    #[test]
    fn test_meal_update_and_delete_flow() {
        let mut program = UserProgram::new("u1", start());
        let meal = TaskUpdateRequest {
            schema_version: SCHEMA_VERSION.to_string(),
            user_id: "u1".to_string(),
            date: day(0),
            task: TaskId::Meals,
            update: UpdateKind::Meal {
                score: 85.0,
                note: None,
            },
        };
        let outcome = apply_task_update(&mut program, &meal, day(0)).unwrap();
        assert!(outcome.qualified);
        assert_eq!(outcome.streak, 1);

        let meal_id = program.entry(&TaskId::Meals, day(0)).unwrap().history[0].id;
        let delete = TaskUpdateRequest {
            schema_version: SCHEMA_VERSION.to_string(),
            user_id: "u1".to_string(),
            date: day(0),
            task: TaskId::Meals,
            update: UpdateKind::DeleteMeal { meal_id },
        };
        let outcome = apply_task_update(&mut program, &delete, day(0)).unwrap();
        assert!(!outcome.qualified);
        assert_eq!(outcome.streak, 0);
        assert!(program.entry(&TaskId::Meals, day(0)).is_none());
    }

    #[test]
    fn test_invalid_request_is_rejected_before_mutation() {
        let mut program = UserProgram::new("u1", start());
        let request = progress_request(TaskId::Exercise, day(0), f64::NAN);
        assert!(apply_task_update(&mut program, &request, day(0)).is_err());
        assert!(program.task_log.is_empty());
    }

    #[test]
    fn test_snapshot_envelope_and_tier() {
        let mut program = UserProgram::new("u1", start());
        program.upsert_progress(TaskId::Exercise, day(0), 100.0);

        let snapshot = compute_statistics(&program, day(0));
        assert_eq!(snapshot.schema_version, STATS_SCHEMA_VERSION);
        assert_eq!(snapshot.producer.name, PRODUCER_NAME);
        assert_eq!(snapshot.user_id, "u1");
        assert_eq!(snapshot.tier.name, "Bronze");
        assert_eq!(snapshot.series.len(), 1);
        assert_eq!(snapshot.streaks.len(), catalog::all_definitions().len());
    }

    #[test]
    fn test_recompute_statistics_is_stable() {
        let mut program = UserProgram::new("u1", start());
        program.upsert_progress(TaskId::Exercise, day(0), 100.0);
        program.upsert_progress(TaskId::Sleep, day(1), 110.0);

        let first = compute_statistics(&program, day(1));
        let second = compute_statistics(&program, day(1));
        assert_eq!(first.series, second.series);
        assert_eq!(first.current_score, second.current_score);
        assert_eq!(first.streaks, second.streaks);
        assert_eq!(first.key_factors, second.key_factors);
    }

    #[test]
    fn test_key_factor_ordering() {
        let mut program = UserProgram::new("u1", start());
        // Exercise streak of 2, sleep streak of 1
        program.upsert_progress(TaskId::Exercise, day(0), 100.0);
        program.upsert_progress(TaskId::Exercise, day(1), 100.0);
        program.upsert_progress(TaskId::Sleep, day(1), 90.0);
        // Sun logged but below goal: impact without a streak
        program.upsert_progress(TaskId::SunExposure, day(0), 50.0);
        // Alcohol logged heavily: most negative idle don't
        program.upsert_progress(TaskId::Alcohol, day(0), 100.0);

        let snapshot = compute_statistics(&program, day(1));
        let order: Vec<&str> = snapshot
            .key_factors
            .iter()
            .map(|f| f.task.as_str())
            .collect();

        // Streaking tasks lead, longest first
        assert_eq!(order[0], "exercise");
        assert_eq!(order[1], "sleep");
        // Then idle dos by impact: sun (7.5) ahead of meals/supplements (0)
        assert_eq!(order[2], "sun_exposure");
        // Don'ts close the list, most negative first
        assert_eq!(order[5], "alcohol");
        let alcohol_pos = order.iter().position(|t| *t == "alcohol").unwrap();
        let stress_pos = order.iter().position(|t| *t == "stress").unwrap();
        assert!(alcohol_pos < stress_pos);
    }

    #[test]
    fn test_daily_delta_against_previous_day() {
        let mut program = UserProgram::new("u1", start());
        program.upsert_progress(TaskId::Exercise, day(0), 100.0);
        let outcome = apply_task_update(
            &mut program,
            &progress_request(TaskId::Exercise, day(1), 100.0),
            day(1),
        )
        .unwrap();
        // Day 1 gain: 30/125*8 = 1.92
        assert!((outcome.daily_score_delta - 1.92).abs() < 1e-9);
    }

    #[test]
    fn test_engine_round_trip_through_store() {
        let mut store = MemoryStore::new();
        store.insert(UserProgram::new("u1", start()));
        let mut engine = ScoreEngine::new(store);

        let request = progress_request(TaskId::Supplements, Utc::now().date_naive(), 0.0);
        let request = TaskUpdateRequest {
            update: UpdateKind::Checklist {
                checked_items: BTreeSet::from([0, 1, 2, 3]),
            },
            ..request
        };
        let outcome = engine.handle_update(&request).unwrap();
        assert!(outcome.qualified);

        let snapshot = engine.statistics("u1").unwrap();
        assert_eq!(snapshot.current_score, outcome.snapshot.current_score);
        assert!(matches!(
            engine.statistics("nobody"),
            Err(EngineError::UserNotFound(_))
        ));
    }
}
