//! Status command for Cadence.
//!
//! Shows the deck overview counts.

use serde::{Deserialize, Serialize};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::core::{DeckStatus, UserId};
use crate::scheduler::Scheduler;
use crate::storage::{DeckRegistry, LearningRecordStore};

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    /// Whether the status was computed.
    pub success: bool,
    /// The deck the counts belong to.
    pub deck_id: String,
    /// Never-reviewed phrases.
    pub new_count: u32,
    /// Phrases reviewed today.
    pub learning_count: u32,
    /// Phrases due for review.
    pub due_count: u32,
    /// Phrases reviewed today.
    pub studied_today: u32,
    /// Counts stopped at the display cap.
    pub capped: bool,
    /// Error message if the status failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutput {
    /// Create a successful output.
    pub fn success(deck_id: impl Into<String>, status: DeckStatus) -> Self {
        Self {
            success: true,
            deck_id: deck_id.into(),
            new_count: status.new_count,
            learning_count: status.learning_count,
            due_count: status.due_count,
            studied_today: status.studied_today,
            capped: status.capped,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(deck_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            deck_id: deck_id.into(),
            new_count: 0,
            learning_count: 0,
            due_count: 0,
            studied_today: 0,
            capped: false,
            error: Some(error.into()),
        }
    }
}

/// The status command implementation.
pub struct StatusCommand<'a, S, R, P, C> {
    scheduler: &'a Scheduler<S, R, P, C>,
}

impl<'a, S, R, P, C> StatusCommand<'a, S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a new status command.
    pub fn new(scheduler: &'a Scheduler<S, R, P, C>) -> Self {
        Self { scheduler }
    }

    /// Run the status command.
    pub fn run(&self, deck_id: &str, user: &UserId, _options: &StatusOptions) -> StatusOutput {
        match self.scheduler.get_deck_status(deck_id, user) {
            Ok(status) => StatusOutput::success(deck_id, status),
            Err(e) => StatusOutput::failure(deck_id, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let plus = if output.capped { "+" } else { "" };
        let mut lines = vec![
            format!("Deck {}", output.deck_id),
            String::new(),
            format!("  New:      {}{}", output.new_count, plus),
            format!("  Learning: {}{}", output.learning_count, plus),
            format!("  Due:      {}{}", output.due_count, plus),
            String::new(),
            format!("Studied today: {}", output.studied_today),
        ];
        if output.new_count + output.due_count == 0 {
            lines.push("Nothing left to study right now.".to_string());
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}
