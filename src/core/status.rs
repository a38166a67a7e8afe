//! Deck status aggregation for Cadence.
//!
//! Counts items by resolved state for the deck overview. The scan stops once
//! `new + learning + due` reaches the display cap, so large decks still load
//! quickly; the counts are then a lower bound and `capped` says so.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{ItemId, LearningRecord};
use crate::core::resolve::{resolve, DayBoundary};

/// Default bound on `new_count + learning_count + due_count`.
pub const DEFAULT_STATUS_CAP: u32 = 20;

/// Per-deck counts shown on the deck overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStatus {
    /// Never-reviewed items.
    pub new_count: u32,
    /// Items reviewed today.
    pub learning_count: u32,
    /// Previously reviewed items due now.
    pub due_count: u32,
    /// Items whose last review fell on the current day.
    pub studied_today: u32,
    /// The scan stopped at the cap with items left unexamined.
    #[serde(default)]
    pub capped: bool,
}

impl DeckStatus {
    /// Items a normal session could pick from right now.
    pub fn available(&self) -> u32 {
        self.new_count + self.due_count
    }

    fn counted(&self) -> u32 {
        self.new_count + self.learning_count + self.due_count
    }
}

/// Count a deck's items by resolved state.
///
/// `items` is the deck in catalog order and `latest` maps items to their
/// latest record. Not-yet-due reviewed items and suspended items count
/// towards nothing.
pub fn aggregate(
    items: &[ItemId],
    latest: &HashMap<ItemId, LearningRecord>,
    now: DateTime<Utc>,
    day: DayBoundary,
    cap: u32,
) -> DeckStatus {
    let mut status = DeckStatus::default();

    for id in items {
        if status.counted() >= cap {
            status.capped = true;
            break;
        }

        let state = resolve(latest.get(id), now, day);
        if state.is_suspended {
            continue;
        }
        if state.is_new {
            status.new_count += 1;
        } else if state.studied_today {
            status.learning_count += 1;
            status.studied_today += 1;
        } else if state.is_due {
            status.due_count += 1;
        }
    }

    status
}
