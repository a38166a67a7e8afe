//! Init command for Cadence.
//!
//! Seeds a learner's records for every phrase of a deck and adds the deck
//! to their list.

use serde::{Deserialize, Serialize};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::core::{InitReport, UserId};
use crate::error::CadenceError;
use crate::scheduler::Scheduler;
use crate::storage::{DeckRegistry, LearningRecordStore};

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization completed.
    pub success: bool,
    /// The deck that was initialized.
    pub deck_id: String,
    /// Records created by this run.
    pub seeded: usize,
    /// Items that already had a record.
    pub already_initialized: usize,
    /// Whether the deck was newly added to the learner's list.
    pub deck_registered: bool,
    /// Whether running init again may succeed.
    #[serde(default)]
    pub retryable: bool,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(deck_id: impl Into<String>, report: InitReport) -> Self {
        Self {
            success: true,
            deck_id: deck_id.into(),
            seeded: report.seeded,
            already_initialized: report.already_initialized,
            deck_registered: report.deck_registered,
            retryable: false,
            error: None,
        }
    }

    /// Create a failed output with partial progress.
    ///
    /// `seeded` reports records written before the failure.
    pub fn failure(
        deck_id: impl Into<String>,
        seeded: usize,
        retryable: bool,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            deck_id: deck_id.into(),
            seeded,
            already_initialized: 0,
            deck_registered: false,
            retryable,
            error: Some(error.into()),
        }
    }
}

/// The init command implementation.
pub struct InitCommand<'a, S, R, P, C> {
    scheduler: &'a Scheduler<S, R, P, C>,
}

impl<'a, S, R, P, C> InitCommand<'a, S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a new init command.
    pub fn new(scheduler: &'a Scheduler<S, R, P, C>) -> Self {
        Self { scheduler }
    }

    /// Run the init command.
    pub fn run(&self, deck_id: &str, user: &UserId, _options: &InitOptions) -> InitOutput {
        match self.scheduler.ensure_deck_initialized(deck_id, user) {
            Ok(report) => InitOutput::success(deck_id, report),
            Err(e) => {
                let seeded = match &e {
                    CadenceError::Initialization { seeded, .. } => *seeded,
                    _ => 0,
                };
                InitOutput::failure(deck_id, seeded, e.is_retryable(), e.to_string())
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &InitOutput) -> String {
        if !output.success {
            let mut message = format!(
                "Init failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
            if output.seeded > 0 {
                message.push_str(&format!(
                    "{} phrase(s) were seeded before the failure.\n",
                    output.seeded
                ));
            }
            if output.retryable {
                message.push_str("Run init again to finish.\n");
            }
            return message;
        }

        let mut lines = Vec::new();
        if output.seeded == 0 {
            lines.push(format!(
                "Deck {} is already initialized ({} phrase(s)).",
                output.deck_id, output.already_initialized
            ));
        } else {
            lines.push(format!(
                "Initialized deck {}: {} new phrase(s) seeded.",
                output.deck_id, output.seeded
            ));
            if output.already_initialized > 0 {
                lines.push(format!(
                    "{} phrase(s) already had progress.",
                    output.already_initialized
                ));
            }
        }
        if output.deck_registered {
            lines.push("Added to your decks.".to_string());
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}
