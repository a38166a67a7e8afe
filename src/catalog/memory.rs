//! In-memory phrase catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::catalog::PhraseCatalog;
use crate::core::ItemId;
use crate::error::{CadenceError, Result};

/// In-memory catalog for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    decks: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            decks: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a deck with phrases in study order.
    pub fn insert_deck<I, S>(&self, deck_id: impl Into<String>, phrase_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrase_ids.into_iter().map(Into::into).collect();
        self.decks.write().unwrap().insert(deck_id.into(), phrases);
    }

    /// Builder-style variant of [`insert_deck`](Self::insert_deck).
    pub fn with_deck<I, S>(self, deck_id: impl Into<String>, phrase_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_deck(deck_id, phrase_ids);
        self
    }
}

impl PhraseCatalog for MemoryCatalog {
    fn list_item_ids(&self, deck_id: &str) -> Result<Vec<ItemId>> {
        let decks = self.decks.read().unwrap();
        let phrases = decks
            .get(deck_id)
            .ok_or_else(|| CadenceError::deck_not_found(deck_id))?;
        Ok(phrases
            .iter()
            .map(|phrase| ItemId::new(deck_id, phrase.as_str()))
            .collect())
    }
}
