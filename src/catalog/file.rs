//! TOML phrase catalog.
//!
//! One file per deck, `<catalog_dir>/<deck_id>.toml`, listing phrases in
//! study order:
//!
//! ```toml
//! title = "Optional display title"
//!
//! [[phrases]]
//! id = "1"
//! text = "Optional lyric line"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::PhraseCatalog;
use crate::config::default_catalog_dir;
use crate::core::ItemId;
use crate::error::{CadenceError, Result};
use crate::util::read_to_string_limited;

// Other keys (titles, lyric text) are for humans and ignored here.
#[derive(Debug, Deserialize)]
struct DeckFile {
    #[serde(default)]
    phrases: Vec<PhraseEntry>,
}

#[derive(Debug, Deserialize)]
struct PhraseEntry {
    id: String,
}

/// Catalog backed by a directory of deck files.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    /// Catalog in the default directory (`~/.cadence/decks/`).
    pub fn new() -> Result<Self> {
        let dir = default_catalog_dir().ok_or_else(|| {
            CadenceError::config("Could not determine catalog directory (no home directory)")
        })?;
        Ok(Self::with_dir(dir))
    }

    /// Catalog in a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a deck's file.
    ///
    /// Returns `None` for ids that are not a plain file name.
    pub fn deck_path(&self, deck_id: &str) -> Option<PathBuf> {
        let safe = !deck_id.is_empty()
            && !deck_id.starts_with('.')
            && !deck_id.contains(['/', '\\'])
            && Path::new(deck_id).file_name().is_some();
        safe.then(|| self.dir.join(format!("{}.toml", deck_id)))
    }

    fn parse(path: &Path, deck_id: &str) -> Result<Vec<ItemId>> {
        let content = read_to_string_limited(path)?;
        let deck: DeckFile = toml::from_str(&content).map_err(|e| {
            CadenceError::catalog(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(deck.phrases.len());
        for phrase in deck.phrases {
            let id = phrase.id.trim();
            if id.is_empty() {
                return Err(CadenceError::catalog(format!(
                    "{}: phrase with empty id",
                    path.display()
                )));
            }
            if !seen.insert(id.to_string()) {
                return Err(CadenceError::catalog(format!(
                    "{}: duplicate phrase id '{}'",
                    path.display(),
                    id
                )));
            }
            items.push(ItemId::new(deck_id, id));
        }
        Ok(items)
    }
}

impl PhraseCatalog for FileCatalog {
    fn list_item_ids(&self, deck_id: &str) -> Result<Vec<ItemId>> {
        let path = self
            .deck_path(deck_id)
            .filter(|path| path.is_file())
            .ok_or_else(|| CadenceError::deck_not_found(deck_id))?;
        let items = Self::parse(&path, deck_id)?;
        tracing::debug!(deck = deck_id, items = items.len(), "loaded deck catalog");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_deck(dir: &Path, deck_id: &str, content: &str) {
        fs::write(dir.join(format!("{}.toml", deck_id)), content).unwrap();
    }

    #[test]
    fn test_reads_phrases_in_file_order() {
        let dir = TempDir::new().unwrap();
        write_deck(
            dir.path(),
            "song-uuid",
            r#"
title = "A song"

[[phrases]]
id = "10"
text = "first line"

[[phrases]]
id = "2"
"#,
        );

        let catalog = FileCatalog::with_dir(dir.path());
        let items = catalog.list_item_ids("song-uuid").unwrap();
        assert_eq!(
            items,
            vec![ItemId::new("song-uuid", "10"), ItemId::new("song-uuid", "2")]
        );
    }

    #[test]
    fn test_missing_deck() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::with_dir(dir.path());
        let err = catalog.list_item_ids("nope").unwrap_err();
        assert!(matches!(err, CadenceError::DeckNotFound { .. }));
    }

    #[test]
    fn test_path_traversal_is_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::with_dir(dir.path().join("decks"));
        write_deck(dir.path(), "secret", "[[phrases]]\nid = \"1\"\n");

        assert!(catalog.deck_path("../secret").is_none());
        assert!(catalog.deck_path(".hidden").is_none());
        assert!(catalog.deck_path("").is_none());
        assert!(matches!(
            catalog.list_item_ids("../secret").unwrap_err(),
            CadenceError::DeckNotFound { .. }
        ));
    }

    #[test]
    fn test_empty_deck() {
        let dir = TempDir::new().unwrap();
        write_deck(dir.path(), "empty", "title = \"Nothing here\"\n");
        let catalog = FileCatalog::with_dir(dir.path());
        assert!(catalog.list_item_ids("empty").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_phrase_rejected() {
        let dir = TempDir::new().unwrap();
        write_deck(
            dir.path(),
            "dup",
            "[[phrases]]\nid = \"1\"\n\n[[phrases]]\nid = \"1\"\n",
        );
        let catalog = FileCatalog::with_dir(dir.path());
        let err = catalog.list_item_ids("dup").unwrap_err();
        assert!(matches!(err, CadenceError::Catalog { .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        write_deck(dir.path(), "broken", "[[phrases\n");
        let catalog = FileCatalog::with_dir(dir.path());
        assert!(matches!(
            catalog.list_item_ids("broken").unwrap_err(),
            CadenceError::Catalog { .. }
        ));
    }
}
