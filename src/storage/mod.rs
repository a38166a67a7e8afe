//! Learner data storage for Cadence.
//!
//! This module provides the append-only learning record store and the deck
//! registry, each with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{FileDeckRegistry, FileRecordStore};
pub use memory::{MemoryDeckRegistry, MemoryRecordStore};
pub use traits::{DeckEntry, DeckEntryStatus, DeckRegistry, LearningRecordStore};
