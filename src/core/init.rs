//! Deck initialization for Cadence.
//!
//! Seeding is idempotent by construction: the set of items to seed is always
//! recomputed as "deck items without any record", so a partial earlier run
//! only leaves the still-missing subset behind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::memory::MemoryState;
use crate::core::record::{ItemId, LearningRecord, EPOCH_ZERO};

/// Items of the deck that have no record yet, in catalog order.
pub fn items_needing_seed(deck_items: &[ItemId], existing: &HashSet<ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    deck_items
        .iter()
        .filter(|id| !existing.contains(*id) && seen.insert(*id))
        .cloned()
        .collect()
}

/// The zero record of an item that has never been reviewed.
pub fn seed_record(item_id: ItemId) -> LearningRecord {
    let initial = MemoryState::initial();
    LearningRecord {
        item_id,
        reps: initial.reps,
        lapses: initial.lapses,
        stability: initial.stability,
        difficulty: initial.difficulty,
        retrievability: 0.0,
        last_review: EPOCH_ZERO,
        next_review: EPOCH_ZERO,
        last_interval: initial.last_interval,
        is_removed: false,
        seq: 0,
    }
}

/// Zero records for every item that still needs one.
pub fn seed_records(deck_items: &[ItemId], existing: &HashSet<ItemId>) -> Vec<LearningRecord> {
    items_needing_seed(deck_items, existing)
        .into_iter()
        .map(seed_record)
        .collect()
}

/// Initialization progress of a deck for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckInitStatus {
    /// Every catalog item has at least one record.
    pub fully_initialized: bool,
    /// Items still without a record, in catalog order.
    pub uninitialized: Vec<ItemId>,
}

impl DeckInitStatus {
    /// Compute the status from the deck's items and the ids that have records.
    pub fn compute(deck_items: &[ItemId], existing: &HashSet<ItemId>) -> Self {
        let uninitialized = items_needing_seed(deck_items, existing);
        Self {
            fully_initialized: uninitialized.is_empty(),
            uninitialized,
        }
    }
}

/// Outcome of a successful `ensure_deck_initialized` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitReport {
    /// Number of zero records written by this call.
    pub seeded: usize,
    /// Number of deck items that already had a record.
    pub already_initialized: usize,
    /// Whether this call added the deck to the learner's active decks.
    pub deck_registered: bool,
}
