//! Score timeline construction
//!
//! Aggregates the whole task log into the daily score series: per-day
//! contribution buckets, pool normalization, cumulative walk from the
//! baseline, clamping, and trailing moving-average smoothing. Deterministic
//! for a given (program, today) pair; re-running on the same snapshot yields
//! the identical series.

use crate::catalog;
use crate::contribution::ContributionCalculator;
use crate::program::UserProgram;
use crate::types::{QualityFlag, ScorePoint, SnapshotQuality};
use chrono::NaiveDate;

/// Lower clamp bound for every emitted score value.
pub const SCORE_FLOOR: f64 = 200.0;
/// Upper clamp bound for every emitted score value.
pub const SCORE_CEILING: f64 = 1100.0;
/// Daily positive pool scale: a perfect "do" day moves the score by this much.
pub const POSITIVE_DAILY_SCALE: f64 = 8.0;
/// Daily negative pool scale.
pub const NEGATIVE_DAILY_SCALE: f64 = 3.0;
/// Smoothing window cap in days.
pub const MAX_SMOOTHING_WINDOW: usize = 5;

/// The computed daily series plus its derived display values.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Smoothed, clamped series, one point per program day
    pub points: Vec<ScorePoint>,
    /// Clamped cumulative series before smoothing
    pub raw_series: Vec<f64>,
    /// Rounded current score, taken from the raw (unsmoothed) last value
    pub current_score: i64,
    /// Display-only trend against the first smoothed point, in percent
    pub trend_pct: f64,
    pub quality: SnapshotQuality,
}

/// Timeline builder over a full program snapshot.
pub struct TimelineBuilder;

impl TimelineBuilder {
    /// Build the daily score series from program start through `today`.
    pub fn build(program: &UserProgram, today: NaiveDate) -> Timeline {
        let duration = program_duration(program.start_date, today);
        let (positive, negative, quality) = day_buckets(program, duration);

        let positive_pool = catalog::total_positive_impact();
        let negative_pool = catalog::total_negative_impact();

        let mut raw_series = Vec::with_capacity(duration);
        let mut cumulative = program.baseline_score;
        for day in 0..duration {
            let scaled_positive = scale(positive[day], positive_pool, POSITIVE_DAILY_SCALE);
            let scaled_negative = scale(negative[day], negative_pool, NEGATIVE_DAILY_SCALE);
            cumulative += scaled_positive + scaled_negative;
            raw_series.push(cumulative.clamp(SCORE_FLOOR, SCORE_CEILING));
        }

        let smoothed = smooth(&raw_series, smoothing_window(duration));
        let points = smoothed
            .iter()
            .enumerate()
            .map(|(day, value)| ScorePoint {
                day_index: day as u32,
                smoothed_value: *value,
            })
            .collect();

        let final_raw = raw_series.last().copied().unwrap_or(program.baseline_score);
        let current_score = final_raw.round() as i64;
        let trend_pct = match smoothed.first() {
            Some(&first) if first > 0.0 => (current_score as f64 - first) / first * 100.0,
            _ => 0.0,
        };

        Timeline {
            points,
            raw_series,
            current_score,
            trend_pct,
            quality,
        }
    }
}

/// Whole days covered by the program, never less than one.
pub fn program_duration(start_date: NaiveDate, today: NaiveDate) -> usize {
    let days = (today - start_date).num_days() + 1;
    days.max(1) as usize
}

/// Day index of a log date within the series. Dates before program start
/// clamp to 0; dates past `today` clamp to the last day.
pub fn day_index(start_date: NaiveDate, date: NaiveDate, duration: usize) -> usize {
    let offset = (date - start_date).num_days();
    offset.clamp(0, duration as i64 - 1) as usize
}

/// Sum every entry's contribution into per-day positive and negative buckets.
fn day_buckets(
    program: &UserProgram,
    duration: usize,
) -> (Vec<f64>, Vec<f64>, SnapshotQuality) {
    let mut positive = vec![0.0; duration];
    let mut negative = vec![0.0; duration];
    let mut quality = SnapshotQuality::default();

    if program.task_log.is_empty() {
        quality.flags.push(QualityFlag::EmptyLog);
        return (positive, negative, quality);
    }

    for entry in &program.task_log {
        quality.entries_seen += 1;

        let Some(def) = catalog::definition_of(&entry.task) else {
            quality.entries_skipped += 1;
            push_flag(&mut quality, QualityFlag::UnknownTask);
            continue;
        };
        if !entry.raw_progress.is_finite() {
            quality.entries_skipped += 1;
            push_flag(&mut quality, QualityFlag::MalformedEntry);
            continue;
        }

        let day = day_index(program.start_date, entry.date, duration);
        let contribution = ContributionCalculator::contribution(def, entry);
        if contribution > 0.0 {
            positive[day] += contribution;
        } else if contribution < 0.0 {
            negative[day] += contribution;
        }
    }

    (positive, negative, quality)
}

fn push_flag(quality: &mut SnapshotQuality, flag: QualityFlag) {
    if !quality.flags.contains(&flag) {
        quality.flags.push(flag);
    }
}

/// Normalize a day's bucket against its pool. Empty pools yield 0.
fn scale(bucket: f64, pool: f64, daily_scale: f64) -> f64 {
    if pool <= 0.0 {
        return 0.0;
    }
    bucket / pool * daily_scale
}

/// Smoothing window for a program of `duration` days.
pub fn smoothing_window(duration: usize) -> usize {
    MAX_SMOOTHING_WINDOW.min(duration / 2)
}

/// Trailing simple moving average. The first `window` points pass through
/// unchanged; from there each point averages itself with the `window`
/// preceding values.
fn smooth(raw: &[f64], window: usize) -> Vec<f64> {
    raw.iter()
        .enumerate()
        .map(|(i, &value)| {
            if i < window {
                value
            } else {
                let slice = &raw[i - window..=i];
                slice.iter().sum::<f64>() / slice.len() as f64
            }
        })
        .collect()
}
