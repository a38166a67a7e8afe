//! Review application for Cadence.
//!
//! Turns a grade into the next learning record: runs the memory model on the
//! item's latest record and applies the scheduling-time policy for
//! `next_review`.

use chrono::{DateTime, Duration, Utc};

use crate::core::memory::{self, MemoryState, ReviewOutcome};
use crate::core::record::{Grade, LearningRecord};
use crate::error::Result;

/// Default short-loop delay after an Again grade.
pub const DEFAULT_AGAIN_DELAY_MINUTES: u32 = 5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// When the item becomes due after a review at `now`.
///
/// Again re-drills after `again_delay` regardless of the computed interval;
/// a sub-day interval becomes one day.
pub fn next_review_at(
    grade: Grade,
    interval_days: u32,
    now: DateTime<Utc>,
    again_delay: Duration,
) -> DateTime<Utc> {
    match grade {
        Grade::Again => now + again_delay,
        Grade::Good if interval_days < 1 => now + Duration::days(1),
        Grade::Good => now + Duration::days(i64::from(interval_days)),
    }
}

/// Days elapsed between the previous review and `now`.
///
/// Never-reviewed records count as zero; clock skew that puts the previous
/// review in the future also counts as zero.
pub fn elapsed_days(previous: &LearningRecord, now: DateTime<Utc>) -> f64 {
    if previous.is_unreviewed() {
        return 0.0;
    }
    let seconds = (now - previous.last_review).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

/// Memory state carried by a record.
pub fn memory_state(record: &LearningRecord) -> MemoryState {
    MemoryState {
        difficulty: record.difficulty,
        stability: record.stability,
        reps: record.reps,
        lapses: record.lapses,
        last_interval: record.last_interval,
    }
}

/// Build the record produced by grading `previous` at `now`.
pub fn apply_review(
    previous: &LearningRecord,
    grade: Grade,
    now: DateTime<Utc>,
    again_delay: Duration,
) -> Result<LearningRecord> {
    let outcome: ReviewOutcome =
        memory::update(&memory_state(previous), elapsed_days(previous, now), grade)?;

    Ok(LearningRecord {
        item_id: previous.item_id.clone(),
        reps: outcome.reps,
        lapses: outcome.lapses,
        stability: outcome.stability,
        difficulty: outcome.difficulty,
        retrievability: outcome.retrievability,
        last_review: now,
        next_review: next_review_at(grade, outcome.interval, now, again_delay),
        last_interval: outcome.interval,
        is_removed: false,
        seq: 0,
    })
}

/// Build the record for a same-day "study again" drill.
///
/// The drill only re-stamps the review time; memory strength and the
/// scheduled next review stay as they were.
pub fn restamp_review(previous: &LearningRecord, now: DateTime<Utc>) -> LearningRecord {
    LearningRecord {
        last_review: now,
        seq: 0,
        ..previous.clone()
    }
}
