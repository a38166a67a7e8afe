//! In-memory storage for tests and embedding.
//!
//! Thread-safe implementations of `LearningRecordStore` and `DeckRegistry`
//! backed by `RwLock<HashMap>`. Everything is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::core::resolve::{latest_by_item, latest_record};
use crate::core::{ItemId, LearningRecord, UserId};
use crate::error::Result;
use crate::storage::traits::sort_entries;
use crate::storage::{DeckEntry, DeckRegistry, LearningRecordStore};

/// In-memory learning record store.
///
/// Each learner's records are kept in append order; a record's sequence
/// number is its 1-based position in that log.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    logs: RwLock<HashMap<UserId, Vec<LearningRecord>>>,
}

impl MemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of records across all learners.
    pub fn len(&self) -> usize {
        self.logs.read().unwrap().values().map(Vec::len).sum()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(log: &mut Vec<LearningRecord>, record: &LearningRecord) -> LearningRecord {
        let stored = LearningRecord {
            seq: log.len() as u64 + 1,
            ..record.clone()
        };
        log.push(stored.clone());
        stored
    }
}

impl LearningRecordStore for MemoryRecordStore {
    fn get_latest(&self, user: &UserId, item_id: &ItemId) -> Result<Option<LearningRecord>> {
        let logs = self.logs.read().unwrap();
        Ok(logs.get(user).and_then(|log| {
            latest_record(log.iter().filter(|r| &r.item_id == item_id)).cloned()
        }))
    }

    fn get_all_for_deck(
        &self,
        user: &UserId,
        deck_id: &str,
    ) -> Result<HashMap<ItemId, LearningRecord>> {
        let logs = self.logs.read().unwrap();
        let Some(log) = logs.get(user) else {
            return Ok(HashMap::new());
        };
        Ok(latest_by_item(
            log.iter().filter(|r| r.item_id.in_deck(deck_id)).cloned(),
        ))
    }

    fn append(&self, user: &UserId, record: &LearningRecord) -> Result<LearningRecord> {
        let mut logs = self.logs.write().unwrap();
        let log = logs.entry(user.clone()).or_default();
        Ok(Self::push(log, record))
    }

    fn append_bulk(&self, user: &UserId, records: &[LearningRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut logs = self.logs.write().unwrap();
        let log = logs.entry(user.clone()).or_default();
        for record in records {
            Self::push(log, record);
        }
        Ok(records.len())
    }

    fn history(&self, user: &UserId, item_id: &ItemId) -> Result<Vec<LearningRecord>> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .get(user)
            .map(|log| {
                log.iter()
                    .filter(|r| &r.item_id == item_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory deck registry.
#[derive(Debug, Default)]
pub struct MemoryDeckRegistry {
    decks: RwLock<HashMap<UserId, HashMap<String, DeckEntry>>>,
}

impl MemoryDeckRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            decks: RwLock::new(HashMap::new()),
        }
    }
}

impl DeckRegistry for MemoryDeckRegistry {
    fn get(&self, user: &UserId, deck_id: &str) -> Result<Option<DeckEntry>> {
        let decks = self.decks.read().unwrap();
        Ok(decks.get(user).and_then(|d| d.get(deck_id)).cloned())
    }

    fn register(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut decks = self.decks.write().unwrap();
        let entries = decks.entry(user.clone()).or_default();
        if entries.contains_key(deck_id) {
            return Ok(false);
        }
        entries.insert(deck_id.to_string(), DeckEntry::new(deck_id, now));
        Ok(true)
    }

    fn list(&self, user: &UserId) -> Result<Vec<DeckEntry>> {
        let decks = self.decks.read().unwrap();
        let mut result: Vec<DeckEntry> = decks
            .get(user)
            .map(|d| d.values().cloned().collect())
            .unwrap_or_default();
        sort_entries(&mut result);
        Ok(result)
    }

    fn touch(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut decks = self.decks.write().unwrap();
        if let Some(entry) = decks.get_mut(user).and_then(|d| d.get_mut(deck_id)) {
            entry.last_practiced = Some(now);
        }
        Ok(())
    }
}
