//! Cadence - spaced-repetition scheduling for karaoke phrase decks
//!
//! Cadence decides which lyric phrases a learner should practise next. It
//! keeps an append-only log of learning records per learner, resolves each
//! phrase to new, learning or due, and assembles study sessions. Reviews
//! are rescheduled with an FSRS-style memory model.

pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod storage;
pub mod util;

pub use catalog::{FileCatalog, MemoryCatalog, PhraseCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use core::{
    DayBoundary, DeckInitStatus, DeckStatus, Grade, InitReport, ItemId, LearningRecord,
    ResolvedItemState, SessionBudget, StudyMode, StudySession, UserId,
};
pub use error::{CadenceError, Result};
pub use scheduler::Scheduler;
pub use storage::{
    DeckEntry, DeckEntryStatus, DeckRegistry, FileDeckRegistry, FileRecordStore,
    LearningRecordStore, MemoryDeckRegistry, MemoryRecordStore,
};

// CLI commands
pub use cli::{DecksCommand, InitCommand, PlanCommand, ReviewCommand, StatusCommand};
