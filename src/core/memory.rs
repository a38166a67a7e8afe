//! FSRS memory model for Cadence.
//!
//! Pure functions that evolve an item's memory strength after a review:
//! 1. Retrievability from stability and elapsed time
//! 2. Difficulty update with mean reversion towards the first-Again baseline
//! 3. Stability growth (Good) or post-lapse stability (Again)
//! 4. Interval from stability, then the reps-based caps
//!
//! Only the Again and Good grades exist, so the weights for Hard and Easy
//! are never read.

use serde::{Deserialize, Serialize};

use crate::core::record::Grade;
use crate::error::{CadenceError, Result};

/// FSRS-5 default weights.
pub const WEIGHTS: [f64; 19] = [
    0.4072, 1.1829, 3.1262, 15.4722, 7.2102, 0.5316, 1.0651, 0.0234, 1.616, 0.1544, 1.0824,
    1.9813, 0.0953, 0.2975, 2.2042, 0.2407, 2.9466, 0.5034, 0.6567,
];

/// Forgetting curve factor.
pub const FACTOR: f64 = 0.9;

/// Forgetting curve exponent.
pub const DECAY: f64 = -0.5;

/// Target recall probability at the scheduled review.
pub const REQUESTED_RETENTION: f64 = 0.9;

/// Difficulty bounds.
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Difficulty of a freshly seeded item.
pub const INITIAL_DIFFICULTY: f64 = WEIGHTS[4];

/// Cap on the interval scheduled by the second review.
pub const SECOND_REVIEW_MAX_INTERVAL: u32 = 6;

/// Floor of the cap on later intervals.
pub const MAX_INTERVAL_FLOOR: u32 = 365;

/// Memory state of an item before a review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub difficulty: f64,
    pub stability: f64,
    pub reps: u32,
    pub lapses: u32,
    pub last_interval: u32,
}

impl MemoryState {
    /// State of an item that has never been reviewed.
    pub fn initial() -> Self {
        Self {
            difficulty: INITIAL_DIFFICULTY,
            stability: 0.0,
            reps: 0,
            lapses: 0,
            last_interval: 0,
        }
    }

    /// Check the model's entry preconditions.
    ///
    /// Out-of-range input is a data-integrity error and is reported as-is,
    /// never clamped into range.
    pub fn validate(&self) -> Result<()> {
        if !self.stability.is_finite() || self.stability < 0.0 {
            return Err(CadenceError::invalid_record(format!(
                "stability {} must be finite and non-negative",
                self.stability
            )));
        }
        if !self.difficulty.is_finite()
            || !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty)
        {
            return Err(CadenceError::invalid_record(format!(
                "difficulty {} outside [{}, {}]",
                self.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY
            )));
        }
        // Every review leaves stability > 0, so a reviewed item at zero was
        // corrupted somewhere upstream.
        if self.reps > 0 && self.stability == 0.0 {
            return Err(CadenceError::invalid_record(format!(
                "reviewed state (reps = {}) has zero stability",
                self.reps
            )));
        }
        Ok(())
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Result of applying one review to a memory state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub difficulty: f64,
    pub stability: f64,
    /// Recall probability at the moment of the review.
    pub retrievability: f64,
    pub reps: u32,
    pub lapses: u32,
    /// Days until the next review.
    pub interval: u32,
}

/// Predicted recall probability after `elapsed_days` at the given stability.
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability == 0.0 {
        return 0.0;
    }
    (1.0 + FACTOR * elapsed_days / stability.max(1.0)).powf(DECAY)
}

/// Initial difficulty for a first review with the given grade.
fn initial_difficulty(grade: f64) -> f64 {
    WEIGHTS[4] - (WEIGHTS[5] * (grade - 1.0)).exp() + 1.0
}

fn next_difficulty(state: &MemoryState, r: f64, grade: f64) -> f64 {
    let d = if state.reps == 0 {
        initial_difficulty(grade)
    } else {
        let delta = WEIGHTS[6] * (1.0 / r - 1.0) * (grade - 3.0);
        let d = state.difficulty + delta;
        // D0 of the first-Again baseline
        let baseline = WEIGHTS[4] - (WEIGHTS[5] * 3.0).exp() + 1.0;
        WEIGHTS[7] * baseline + (1.0 - WEIGHTS[7]) * d
    };
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn next_stability(state: &MemoryState, difficulty: f64, r: f64, grade: Grade) -> f64 {
    let s = state.stability;
    let g = grade.value();
    let next = match grade {
        Grade::Good if state.reps == 0 => {
            s.max(0.1) * (WEIGHTS[17] * (g - 3.0 + WEIGHTS[18])).exp()
        }
        Grade::Good => {
            let growth = WEIGHTS[8].exp()
                * (11.0 - difficulty)
                * s.max(0.1).powf(-WEIGHTS[9])
                * (((1.0 - r) * WEIGHTS[10]).exp() - 1.0);
            s * (1.0 + growth)
        }
        Grade::Again => WEIGHTS[0] + WEIGHTS[1] * (difficulty / 10.0) * (s + 1.0).powf(WEIGHTS[2]),
    };
    next.max(0.0)
}

/// Interval in days before the reps-based caps.
pub fn raw_interval(stability: f64) -> u32 {
    let days = (stability / FACTOR) * (REQUESTED_RETENTION.powf(1.0 / DECAY) - 1.0);
    days.round().max(0.0) as u32
}

fn capped_interval(raw: u32, reps: u32, last_interval: u32) -> u32 {
    match reps {
        0 => 1,
        1 => raw.min(SECOND_REVIEW_MAX_INTERVAL),
        _ => raw.min((last_interval.saturating_mul(2)).max(MAX_INTERVAL_FLOOR)),
    }
}

/// Apply one review to a memory state.
///
/// Deterministic and side-effect free. Fails only when `state` or
/// `elapsed_days` violate the preconditions (see [`MemoryState::validate`]).
pub fn update(state: &MemoryState, elapsed_days: f64, grade: Grade) -> Result<ReviewOutcome> {
    state.validate()?;
    if !elapsed_days.is_finite() || elapsed_days < 0.0 {
        return Err(CadenceError::invalid_record(format!(
            "elapsed days {} must be finite and non-negative",
            elapsed_days
        )));
    }

    let r = retrievability(state.stability, elapsed_days);
    let difficulty = next_difficulty(state, r, grade.value());
    let stability = next_stability(state, difficulty, r, grade);
    let interval = capped_interval(raw_interval(stability), state.reps, state.last_interval);

    Ok(ReviewOutcome {
        difficulty,
        stability,
        retrievability: r,
        reps: state.reps + 1,
        lapses: state.lapses + u32::from(grade == Grade::Again),
        interval,
    })
}
