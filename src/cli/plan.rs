//! Plan command for Cadence.
//!
//! Lists the phrases of the next study session in the order they should be
//! shown.

use serde::{Deserialize, Serialize};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::core::{StudyMode, StudySession, UserId};
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::storage::{DeckRegistry, LearningRecordStore};

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum session length. Unset means no limit.
    pub total: Option<usize>,
    /// Maximum new phrases. Unset means the daily new limit.
    pub max_new: Option<usize>,
    /// Plan a study-again session of phrases reviewed today.
    pub again: bool,
}

impl PlanOptions {
    fn has_explicit_limits(&self) -> bool {
        self.total.is_some() || self.max_new.is_some()
    }
}

/// Output format for the plan command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Whether a session was planned.
    pub success: bool,
    /// The deck the session draws from.
    pub deck_id: String,
    /// Rule set that assembled the session.
    pub mode: StudyMode,
    /// Number of phrases in the session.
    pub count: usize,
    /// Phrase ids in presentation order.
    pub phrases: Vec<String>,
    /// Error message if planning failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanOutput {
    /// Create a successful output.
    pub fn success(deck_id: impl Into<String>, session: StudySession) -> Self {
        let mode = session.mode();
        let phrases: Vec<String> = session.into_iter().map(|id| id.phrase_id).collect();
        Self {
            success: true,
            deck_id: deck_id.into(),
            mode,
            count: phrases.len(),
            phrases,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(deck_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            deck_id: deck_id.into(),
            mode: StudyMode::default(),
            count: 0,
            phrases: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The plan command implementation.
pub struct PlanCommand<'a, S, R, P, C> {
    scheduler: &'a Scheduler<S, R, P, C>,
}

impl<'a, S, R, P, C> PlanCommand<'a, S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a new plan command.
    pub fn new(scheduler: &'a Scheduler<S, R, P, C>) -> Self {
        Self { scheduler }
    }

    /// Run the plan command.
    pub fn run(&self, deck_id: &str, user: &UserId, options: &PlanOptions) -> PlanOutput {
        match self.plan(deck_id, user, options) {
            Ok(session) => PlanOutput::success(deck_id, session),
            Err(e) => PlanOutput::failure(deck_id, e.to_string()),
        }
    }

    fn plan(&self, deck_id: &str, user: &UserId, options: &PlanOptions) -> Result<StudySession> {
        if options.again {
            let session = self.scheduler.plan_session(
                deck_id,
                user,
                usize::MAX,
                0,
                StudyMode::StudyAgain,
            )?;
            return Ok(match options.total {
                Some(total) => {
                    StudySession::new(session.mode(), session.into_iter().take(total).collect())
                }
                None => session,
            });
        }

        if options.has_explicit_limits() {
            let daily_new_limit = self.scheduler.scheduling().daily_new_limit as usize;
            return self.scheduler.plan_session(
                deck_id,
                user,
                options.total.unwrap_or(usize::MAX),
                options.max_new.unwrap_or(daily_new_limit),
                StudyMode::Normal,
            );
        }

        self.scheduler.plan_today(deck_id, user)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PlanOutput, options: &PlanOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &PlanOutput) -> String {
        if !output.success {
            return format!(
                "Plan failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.phrases.is_empty() {
            return match output.mode {
                StudyMode::Normal => "Nothing to study right now.\n".to_string(),
                StudyMode::StudyAgain => "No phrases were studied today.\n".to_string(),
            };
        }

        let heading = match output.mode {
            StudyMode::Normal => "Session",
            StudyMode::StudyAgain => "Study-again session",
        };
        let mut lines = vec![format!(
            "{} for deck {} ({} phrase(s)):\n",
            heading, output.deck_id, output.count
        )];
        for (i, phrase) in output.phrases.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, phrase));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}
