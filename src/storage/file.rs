//! File-based storage for Cadence.
//!
//! Each learner gets a directory under `<data_dir>/users/<user>/`:
//! - `records.jsonl`: the append-only learning record log, one JSON record
//!   per line. A record's sequence number is its 1-based line position.
//! - `decks.json`: the learner's registered decks, rewritten atomically via
//!   temp file + rename.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::default_data_dir;
use crate::core::resolve::{latest_by_item, latest_record};
use crate::core::{ItemId, LearningRecord, UserId};
use crate::error::{CadenceError, Result};
use crate::storage::traits::sort_entries;
use crate::storage::{DeckEntry, DeckRegistry, LearningRecordStore};
use crate::util::{atomic_write, read_to_string_limited, read_to_string_with_limit, MAX_RECORD_LOG_SIZE};

const RECORDS_FILE: &str = "records.jsonl";
const DECKS_FILE: &str = "decks.json";

fn user_dir(data_dir: &Path, user: &UserId) -> PathBuf {
    data_dir.join("users").join(user.as_str())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| CadenceError::storage(dir, e))?;
    }
    Ok(())
}

fn no_data_dir() -> CadenceError {
    CadenceError::config("Could not determine data directory (no home directory)")
}

/// JSONL learning record store.
///
/// Appends within one process are serialized by an internal lock so
/// sequence numbers stay unique.
#[derive(Debug)]
pub struct FileRecordStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Create a store in the default data directory.
    ///
    /// Uses `~/.cadence/data/` or `$CADENCE_HOME/data/`.
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir().ok_or_else(no_data_dir)?)
    }

    /// Create a store in a custom data directory.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        ensure_dir(&data_dir)?;
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of a learner's record log.
    pub fn log_path(&self, user: &UserId) -> PathBuf {
        user_dir(&self.data_dir, user).join(RECORDS_FILE)
    }

    /// Read a learner's whole log in append order.
    ///
    /// An unparseable final line with no trailing newline is a torn append
    /// and is skipped; a malformed line anywhere else is an error.
    fn read_log(&self, user: &UserId) -> Result<Vec<LearningRecord>> {
        let path = self.log_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = read_to_string_with_limit(&path, MAX_RECORD_LOG_SIZE)?;
        let torn_tail = !content.is_empty() && !content.ends_with('\n');
        let last_line = content.lines().count().saturating_sub(1);

        let mut records = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<LearningRecord>(line) {
                Ok(mut record) => {
                    record.seq = records.len() as u64 + 1;
                    records.push(record);
                }
                Err(e) if torn_tail && line_num == last_line => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_num + 1,
                        "skipping torn record at end of log: {}",
                        e
                    );
                }
                Err(e) => {
                    return Err(CadenceError::serde(format!(
                        "Failed to parse learning record in {} on line {}: {}",
                        path.display(),
                        line_num + 1,
                        e
                    )));
                }
            }
        }

        Ok(records)
    }

    /// Cut a partial last line left by an interrupted append.
    fn repair_torn_tail(path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let content = read_to_string_with_limit(path, MAX_RECORD_LOG_SIZE)?;
        if content.is_empty() || content.ends_with('\n') {
            return Ok(());
        }

        let keep = content.rfind('\n').map_or(0, |pos| pos + 1);
        tracing::warn!(
            path = %path.display(),
            dropped_bytes = content.len() - keep,
            "truncating torn record at end of log"
        );
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| CadenceError::storage(path, e))?;
        file.set_len(keep as u64)
            .map_err(|e| CadenceError::storage(path, e))
    }

    /// Append records with consecutive sequence numbers in a single write.
    fn write_records(&self, user: &UserId, records: &[LearningRecord]) -> Result<Vec<LearningRecord>> {
        let _guard = self.write_lock.lock().unwrap();

        let path = self.log_path(user);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        Self::repair_torn_tail(&path)?;
        let first_seq = self.read_log(user)?.len() as u64 + 1;
        let mut buffer = String::new();
        let mut stored = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let record = LearningRecord {
                seq: first_seq + offset as u64,
                ..record.clone()
            };
            let json = serde_json::to_string(&record).map_err(|e| {
                CadenceError::serde(format!("Failed to serialize learning record: {}", e))
            })?;
            buffer.push_str(&json);
            buffer.push('\n');
            stored.push(record);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CadenceError::storage(&path, e))?;
        let start = file
            .metadata()
            .map_err(|e| CadenceError::storage(&path, e))?
            .len();
        if let Err(e) = file.write_all(buffer.as_bytes()) {
            // Roll back a partial write so the log stays line-aligned.
            if let Err(rollback) = file.set_len(start) {
                tracing::warn!(path = %path.display(), "failed to roll back partial append: {}", rollback);
            }
            return Err(CadenceError::storage(&path, e));
        }

        Ok(stored)
    }
}

impl LearningRecordStore for FileRecordStore {
    fn get_latest(&self, user: &UserId, item_id: &ItemId) -> Result<Option<LearningRecord>> {
        let log = self.read_log(user)?;
        Ok(latest_record(log.iter().filter(|r| &r.item_id == item_id)).cloned())
    }

    fn get_all_for_deck(
        &self,
        user: &UserId,
        deck_id: &str,
    ) -> Result<HashMap<ItemId, LearningRecord>> {
        let log = self.read_log(user)?;
        Ok(latest_by_item(
            log.into_iter().filter(|r| r.item_id.in_deck(deck_id)),
        ))
    }

    fn append(&self, user: &UserId, record: &LearningRecord) -> Result<LearningRecord> {
        self.write_records(user, std::slice::from_ref(record))?
            .pop()
            .ok_or_else(|| CadenceError::store("append wrote no record"))
    }

    fn append_bulk(&self, user: &UserId, records: &[LearningRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        Ok(self.write_records(user, records)?.len())
    }

    fn history(&self, user: &UserId, item_id: &ItemId) -> Result<Vec<LearningRecord>> {
        Ok(self
            .read_log(user)?
            .into_iter()
            .filter(|r| &r.item_id == item_id)
            .collect())
    }
}

/// JSON deck registry, one file per learner.
#[derive(Debug)]
pub struct FileDeckRegistry {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDeckRegistry {
    /// Create a registry in the default data directory.
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir().ok_or_else(no_data_dir)?)
    }

    /// Create a registry in a custom data directory.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        ensure_dir(&data_dir)?;
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of a learner's deck file.
    pub fn decks_path(&self, user: &UserId) -> PathBuf {
        user_dir(&self.data_dir, user).join(DECKS_FILE)
    }

    fn load(&self, user: &UserId) -> Result<Vec<DeckEntry>> {
        let path = self.decks_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = read_to_string_limited(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            CadenceError::serde(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn save(&self, user: &UserId, entries: &[DeckEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        atomic_write(&self.decks_path(user), json.as_bytes())
    }
}

impl DeckRegistry for FileDeckRegistry {
    fn get(&self, user: &UserId, deck_id: &str) -> Result<Option<DeckEntry>> {
        Ok(self
            .load(user)?
            .into_iter()
            .find(|entry| entry.deck_id == deck_id))
    }

    fn register(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap();
        let mut entries = self.load(user)?;
        if entries.iter().any(|entry| entry.deck_id == deck_id) {
            return Ok(false);
        }
        entries.push(DeckEntry::new(deck_id, now));
        self.save(user, &entries)?;
        Ok(true)
    }

    fn list(&self, user: &UserId) -> Result<Vec<DeckEntry>> {
        let mut entries = self.load(user)?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn touch(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut entries = self.load(user)?;
        let Some(entry) = entries.iter_mut().find(|entry| entry.deck_id == deck_id) else {
            return Ok(());
        };
        entry.last_practiced = Some(now);
        self.save(user, &entries)
    }
}
