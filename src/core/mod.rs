//! Core types and logic for Cadence.
//!
//! This module contains the learning record types, the memory model, record
//! resolution, and the pure planning and aggregation rules built on them.
//! Nothing in here touches storage or the clock.

pub mod init;
pub mod memory;
pub mod planner;
pub mod record;
pub mod resolve;
pub mod review;
pub mod status;

pub use init::{seed_record, seed_records, DeckInitStatus, InitReport};
pub use memory::{MemoryState, ReviewOutcome, WEIGHTS};
pub use planner::{plan, SessionBudget, StudyMode, StudySession};
pub use record::{Grade, ItemId, LearningRecord, UserId, EPOCH_ZERO};
pub use resolve::{latest_by_item, latest_record, resolve, DayBoundary, ResolvedItemState};
pub use review::{apply_review, restamp_review, DEFAULT_AGAIN_DELAY_MINUTES};
pub use status::{aggregate, DeckStatus, DEFAULT_STATUS_CAP};
