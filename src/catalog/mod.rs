//! Phrase catalogs for Cadence.
//!
//! A catalog lists the items of each deck in study order. Cadence only needs
//! the ordered item ids; lyrics, audio and translations stay with the
//! client.

pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::core::ItemId;
use crate::error::Result;

pub use file::FileCatalog;
pub use memory::MemoryCatalog;

/// Source of a deck's ordered item list.
pub trait PhraseCatalog: Send + Sync {
    /// Item ids of a deck in catalog order.
    ///
    /// Returns `DeckNotFound` for unknown decks.
    fn list_item_ids(&self, deck_id: &str) -> Result<Vec<ItemId>>;
}

impl<T: PhraseCatalog + ?Sized> PhraseCatalog for Arc<T> {
    fn list_item_ids(&self, deck_id: &str) -> Result<Vec<ItemId>> {
        (**self).list_item_ids(deck_id)
    }
}
