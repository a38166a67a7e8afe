//! Decks command for Cadence.
//!
//! Lists the learner's decks, most recently practiced first.

use serde::{Deserialize, Serialize};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::core::UserId;
use crate::scheduler::Scheduler;
use crate::storage::{DeckEntry, DeckRegistry, LearningRecordStore};

/// Options for the decks command.
#[derive(Debug, Clone, Default)]
pub struct DecksOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the decks command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecksOutput {
    /// Whether the decks were listed.
    pub success: bool,
    /// Number of decks.
    pub count: usize,
    /// The decks.
    pub decks: Vec<DeckInfo>,
    /// Error message if listing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simplified deck entry for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckInfo {
    pub deck_id: String,
    /// Date the deck was added (`YYYY-MM-DD`).
    pub date_added: String,
    /// Date of the last review, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_practiced: Option<String>,
    pub status: String,
}

impl From<&DeckEntry> for DeckInfo {
    fn from(entry: &DeckEntry) -> Self {
        Self {
            deck_id: entry.deck_id.clone(),
            date_added: entry.date_added.format("%Y-%m-%d").to_string(),
            last_practiced: entry
                .last_practiced
                .map(|at| at.format("%Y-%m-%d").to_string()),
            status: format!("{:?}", entry.status).to_lowercase(),
        }
    }
}

impl DecksOutput {
    /// Create a successful output.
    pub fn success(decks: Vec<DeckInfo>) -> Self {
        Self {
            success: true,
            count: decks.len(),
            decks,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            decks: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The decks command implementation.
pub struct DecksCommand<'a, S, R, P, C> {
    scheduler: &'a Scheduler<S, R, P, C>,
}

impl<'a, S, R, P, C> DecksCommand<'a, S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a new decks command.
    pub fn new(scheduler: &'a Scheduler<S, R, P, C>) -> Self {
        Self { scheduler }
    }

    /// Run the decks command.
    pub fn run(&self, user: &UserId, _options: &DecksOptions) -> DecksOutput {
        match self.scheduler.list_decks(user) {
            Ok(entries) => DecksOutput::success(entries.iter().map(DeckInfo::from).collect()),
            Err(e) => DecksOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DecksOutput, options: &DecksOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &DecksOutput) -> String {
        if !output.success {
            return format!(
                "Listing decks failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.decks.is_empty() {
            return "No decks yet. Run `cadence init <deck>` to add one.\n".to_string();
        }

        let mut lines = vec![format!("{} deck(s):\n", output.count)];
        for deck in &output.decks {
            let practiced = deck.last_practiced.as_deref().unwrap_or("never");
            lines.push(format!(
                "  {}  added {}, last practiced {}",
                deck.deck_id, deck.date_added, practiced
            ));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::{at, learner, test_scheduler};
    use crate::core::{Grade, ItemId};
    use chrono::Duration;

    #[test]
    fn test_decks_empty() {
        let (scheduler, _clock) = test_scheduler();
        let cmd = DecksCommand::new(&scheduler);

        let output = cmd.run(&learner(), &DecksOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 0);
        let text = cmd.format_output(&output, &DecksOptions::default());
        assert!(text.contains("No decks yet"));
    }

    #[test]
    fn test_decks_show_added_and_practiced_dates() {
        let (scheduler, clock) = test_scheduler();
        let user = learner();
        scheduler.ensure_deck_initialized("song", &user).unwrap();
        clock.advance(Duration::days(1));
        scheduler.ensure_deck_initialized("song", &user).unwrap();
        scheduler
            .submit_review(&ItemId::new("song", "1"), &user, Grade::Good)
            .unwrap();

        let cmd = DecksCommand::new(&scheduler);
        let output = cmd.run(&user, &DecksOptions::default());

        assert_eq!(output.count, 1);
        let deck = &output.decks[0];
        assert_eq!(deck.deck_id, "song");
        assert_eq!(deck.date_added, "2024-05-10");
        assert_eq!(deck.last_practiced.as_deref(), Some("2024-05-11"));
        assert_eq!(deck.status, "active");
    }

    #[test]
    fn test_deck_info_from_entry() {
        let entry = DeckEntry::new("other", at("2024-01-02T03:04:05Z"));
        let info = DeckInfo::from(&entry);

        assert_eq!(info.date_added, "2024-01-02");
        assert!(info.last_practiced.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("last_practiced").is_none());
    }

    #[test]
    fn test_decks_are_per_learner() {
        let (scheduler, _clock) = test_scheduler();
        scheduler.ensure_deck_initialized("song", &learner()).unwrap();

        let cmd = DecksCommand::new(&scheduler);
        let other = UserId::new("someone-else").unwrap();
        assert_eq!(cmd.run(&other, &DecksOptions::default()).count, 0);
    }
}
