//! Storage traits for Cadence.
//!
//! This module defines the `LearningRecordStore` trait for the append-only
//! record log and the `DeckRegistry` trait for a learner's active decks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ItemId, LearningRecord, UserId};
use crate::error::Result;

/// Trait for learning record storage backends.
///
/// Records are only ever appended. The store assigns each appended record
/// a per-learner sequence number, strictly increasing in append order, that
/// breaks ties between records with equal `last_review`.
pub trait LearningRecordStore: Send + Sync {
    /// Latest record of one item, if any.
    fn get_latest(&self, user: &UserId, item_id: &ItemId) -> Result<Option<LearningRecord>>;

    /// Latest record of every item of a deck that has at least one record.
    fn get_all_for_deck(
        &self,
        user: &UserId,
        deck_id: &str,
    ) -> Result<HashMap<ItemId, LearningRecord>>;

    /// Append one record and return it with its sequence number set.
    fn append(&self, user: &UserId, record: &LearningRecord) -> Result<LearningRecord>;

    /// Append several records in one write.
    ///
    /// Returns the number of records written.
    fn append_bulk(&self, user: &UserId, records: &[LearningRecord]) -> Result<usize>;

    /// Every record of one item in append order.
    fn history(&self, user: &UserId, item_id: &ItemId) -> Result<Vec<LearningRecord>>;
}

/// Blanket implementation of LearningRecordStore for Arc-wrapped stores.
impl<T: LearningRecordStore + ?Sized> LearningRecordStore for Arc<T> {
    fn get_latest(&self, user: &UserId, item_id: &ItemId) -> Result<Option<LearningRecord>> {
        (**self).get_latest(user, item_id)
    }

    fn get_all_for_deck(
        &self,
        user: &UserId,
        deck_id: &str,
    ) -> Result<HashMap<ItemId, LearningRecord>> {
        (**self).get_all_for_deck(user, deck_id)
    }

    fn append(&self, user: &UserId, record: &LearningRecord) -> Result<LearningRecord> {
        (**self).append(user, record)
    }

    fn append_bulk(&self, user: &UserId, records: &[LearningRecord]) -> Result<usize> {
        (**self).append_bulk(user, records)
    }

    fn history(&self, user: &UserId, item_id: &ItemId) -> Result<Vec<LearningRecord>> {
        (**self).history(user, item_id)
    }
}

/// Registration state of a learner's deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckEntryStatus {
    #[default]
    Active,
}

/// A deck the learner has added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub deck_id: String,
    pub date_added: DateTime<Utc>,
    /// Last time a review was submitted for this deck.
    #[serde(default)]
    pub last_practiced: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: DeckEntryStatus,
}

impl DeckEntry {
    /// A freshly added, never practiced deck.
    pub fn new(deck_id: impl Into<String>, date_added: DateTime<Utc>) -> Self {
        Self {
            deck_id: deck_id.into(),
            date_added,
            last_practiced: None,
            status: DeckEntryStatus::Active,
        }
    }
}

/// Trait for the per-learner registry of active decks.
pub trait DeckRegistry: Send + Sync {
    /// Look up one deck entry.
    fn get(&self, user: &UserId, deck_id: &str) -> Result<Option<DeckEntry>>;

    /// Register a deck as active.
    ///
    /// Returns `true` if the deck was added, `false` if it was already there.
    fn register(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<bool>;

    /// All decks of the learner, most recently practiced first.
    fn list(&self, user: &UserId) -> Result<Vec<DeckEntry>>;

    /// Record that the learner practiced a deck.
    ///
    /// Unregistered decks are ignored.
    fn touch(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Check if a deck is registered.
    fn exists(&self, user: &UserId, deck_id: &str) -> Result<bool> {
        Ok(self.get(user, deck_id)?.is_some())
    }
}

/// Blanket implementation of DeckRegistry for Arc-wrapped registries.
impl<T: DeckRegistry + ?Sized> DeckRegistry for Arc<T> {
    fn get(&self, user: &UserId, deck_id: &str) -> Result<Option<DeckEntry>> {
        (**self).get(user, deck_id)
    }

    fn register(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<bool> {
        (**self).register(user, deck_id, now)
    }

    fn list(&self, user: &UserId) -> Result<Vec<DeckEntry>> {
        (**self).list(user)
    }

    fn touch(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<()> {
        (**self).touch(user, deck_id, now)
    }
}

/// Sort deck entries most recently practiced first, never-practiced decks
/// last by date added.
pub(crate) fn sort_entries(entries: &mut [DeckEntry]) {
    entries.sort_by(|a, b| {
        b.last_practiced
            .cmp(&a.last_practiced)
            .then_with(|| b.date_added.cmp(&a.date_added))
            .then_with(|| a.deck_id.cmp(&b.deck_id))
    });
}
