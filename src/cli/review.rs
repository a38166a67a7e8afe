//! Review command for Cadence.
//!
//! Grades a phrase and stores the rescheduled record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::core::{Grade, ItemId, LearningRecord, UserId};
use crate::error::{CadenceError, Result};
use crate::scheduler::Scheduler;
use crate::storage::{DeckRegistry, LearningRecordStore};

/// Options for the review command.
#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Record a same-day drill instead of a graded review.
    pub drill: bool,
}

/// Output format for the review command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    /// Whether the review was stored.
    pub success: bool,
    /// The reviewed item, as `deck-phrase`.
    pub item_id: String,
    /// `again`, `good` or `drill`.
    pub action: String,
    /// The card after the review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardInfo>,
    /// Error message if the review failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simplified learning record for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInfo {
    pub reps: u32,
    pub lapses: u32,
    pub stability: f64,
    pub difficulty: f64,
    /// Days until the next review.
    pub interval_days: u32,
    pub next_review: DateTime<Utc>,
}

impl From<&LearningRecord> for CardInfo {
    fn from(record: &LearningRecord) -> Self {
        Self {
            reps: record.reps,
            lapses: record.lapses,
            stability: record.stability,
            difficulty: record.difficulty,
            interval_days: record.last_interval,
            next_review: record.next_review,
        }
    }
}

impl ReviewOutput {
    /// Create a successful output.
    pub fn success(action: impl Into<String>, record: &LearningRecord) -> Self {
        Self {
            success: true,
            item_id: record.item_id.to_string(),
            action: action.into(),
            card: Some(CardInfo::from(record)),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(
        item_id: &ItemId,
        action: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            item_id: item_id.to_string(),
            action: action.into(),
            card: None,
            error: Some(error.into()),
        }
    }
}

/// The review command implementation.
pub struct ReviewCommand<'a, S, R, P, C> {
    scheduler: &'a Scheduler<S, R, P, C>,
}

impl<'a, S, R, P, C> ReviewCommand<'a, S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a new review command.
    pub fn new(scheduler: &'a Scheduler<S, R, P, C>) -> Self {
        Self { scheduler }
    }

    /// Run the review command.
    ///
    /// `grade` is required unless `options.drill` is set, in which case it
    /// is ignored.
    pub fn run(
        &self,
        item_id: &ItemId,
        user: &UserId,
        grade: Option<Grade>,
        options: &ReviewOptions,
    ) -> ReviewOutput {
        let action = if options.drill {
            "drill"
        } else {
            grade.map(Grade::as_str).unwrap_or("review")
        };

        match self.review(item_id, user, grade, options) {
            Ok(record) => ReviewOutput::success(action, &record),
            Err(e) => ReviewOutput::failure(item_id, action, e.to_string()),
        }
    }

    fn review(
        &self,
        item_id: &ItemId,
        user: &UserId,
        grade: Option<Grade>,
        options: &ReviewOptions,
    ) -> Result<LearningRecord> {
        if options.drill {
            return self.scheduler.submit_study_again_review(item_id, user);
        }
        let grade = grade.ok_or_else(|| {
            CadenceError::invalid_record("a grade (again or good) is required")
        })?;
        self.scheduler.submit_review(item_id, user, grade)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReviewOutput, options: &ReviewOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ReviewOutput) -> String {
        let card = match (&output.card, output.success) {
            (Some(card), true) => card,
            _ => {
                return format!(
                    "Review failed: {}\n",
                    output.error.as_deref().unwrap_or("unknown error")
                );
            }
        };

        let next = card.next_review.format("%Y-%m-%d %H:%M UTC");
        let mut text = format!("Recorded {} for {}.\n", output.action, output.item_id);
        if output.action == Grade::Again.as_str() {
            text.push_str(&format!("Next review: {}\n", next));
        } else {
            text.push_str(&format!(
                "Next review: {} (in {} day(s))\n",
                next, card.interval_days
            ));
        }
        text
    }
}
