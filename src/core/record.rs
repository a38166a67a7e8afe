//! Learning record types for Cadence.
//!
//! A `LearningRecord` captures one review event for one item. Records are
//! append-only: a review, a seed, or a suspension always produces a new
//! record, and the current state of an item is whatever its most recent
//! record says.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Sentinel `last_review` value for records that were seeded but never reviewed.
pub const EPOCH_ZERO: DateTime<Utc> = DateTime::UNIX_EPOCH;

/// Maximum length of a user id.
pub const MAX_USER_ID_LEN: usize = 256;

/// Identifier of an authenticated learner.
///
/// Construction validates the id, so every operation that receives a
/// `UserId` can assume the caller has already authenticated. Ids double as
/// directory names in the file store, which is why path separators are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user id (for example a `did:pkh:...` identifier).
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CadenceError::invalid_user("user id is empty"));
        }
        if id.len() > MAX_USER_ID_LEN {
            return Err(CadenceError::invalid_user(format!(
                "user id is longer than {} bytes",
                MAX_USER_ID_LEN
            )));
        }
        if id.starts_with('.') {
            return Err(CadenceError::invalid_user(format!(
                "user id '{}' may not start with '.'",
                id
            )));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-')))
        {
            return Err(CadenceError::invalid_user(format!(
                "user id '{}' contains invalid character {:?}",
                id, bad
            )));
        }
        Ok(Self(id))
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = CadenceError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Composite key of a learning item: the deck (song) plus the phrase within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    /// Deck identifier (song uuid).
    pub deck_id: String,
    /// Phrase identifier within the deck.
    pub phrase_id: String,
}

impl ItemId {
    /// Create an item id.
    pub fn new(deck_id: impl Into<String>, phrase_id: impl Into<String>) -> Self {
        Self {
            deck_id: deck_id.into(),
            phrase_id: phrase_id.into(),
        }
    }

    /// Whether this item belongs to the given deck.
    pub fn in_deck(&self, deck_id: &str) -> bool {
        self.deck_id == deck_id
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.deck_id, self.phrase_id)
    }
}

/// The learner's self-assessed recall outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Failed to recall.
    Again,
    /// Recalled.
    Good,
}

impl Grade {
    /// Numeric grade used by the memory model (Again = 1, Good = 3).
    pub fn value(self) -> f64 {
        match self {
            Self::Again => 1.0,
            Self::Good => 3.0,
        }
    }

    /// Get the grade name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Good => "good",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable review event for one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningRecord {
    /// The item this record belongs to.
    pub item_id: ItemId,
    /// Total review count so far.
    pub reps: u32,
    /// Number of Again grades received.
    pub lapses: u32,
    /// Memory half-life proxy, in days.
    pub stability: f64,
    /// Difficulty in [1, 10].
    pub difficulty: f64,
    /// Predicted recall probability at the moment of this review.
    pub retrievability: f64,
    /// When the review that produced this record happened.
    pub last_review: DateTime<Utc>,
    /// When the item becomes due again.
    pub next_review: DateTime<Utc>,
    /// Days scheduled by this record.
    pub last_interval: u32,
    /// Soft-delete marker: the item is suspended from scheduling.
    pub is_removed: bool,
    /// Store-assigned append sequence number (0 until persisted).
    #[serde(default)]
    pub seq: u64,
}

impl LearningRecord {
    /// Whether this record has never been reviewed (seeded or placeholder).
    pub fn is_unreviewed(&self) -> bool {
        self.last_review == EPOCH_ZERO
    }

    /// Whether the item's scheduled review time has arrived.
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// Copy of this record with a different suspension flag.
    ///
    /// The copy keeps the review timestamps so it sorts as the same review;
    /// the store's sequence number makes it the latest record.
    pub fn with_removed(&self, is_removed: bool) -> Self {
        Self {
            is_removed,
            seq: 0,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_did() {
        let id = UserId::new("did:pkh:eip155:1:0xAbC123").unwrap();
        assert_eq!(id.as_str(), "did:pkh:eip155:1:0xAbC123");
        assert_eq!(id.to_string(), "did:pkh:eip155:1:0xAbC123");
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(matches!(
            UserId::new(""),
            Err(CadenceError::InvalidUser { .. })
        ));
        assert!(UserId::new("   ").is_err());
    }

    #[test]
    fn test_user_id_rejects_path_components() {
        assert!(UserId::new("../etc").is_err());
        assert!(UserId::new("a/b").is_err());
        assert!(UserId::new(".hidden").is_err());
    }

    #[test]
    fn test_user_id_rejects_too_long() {
        assert!(UserId::new("a".repeat(MAX_USER_ID_LEN + 1)).is_err());
        assert!(UserId::new("a".repeat(MAX_USER_ID_LEN)).is_ok());
    }

    #[test]
    fn test_user_id_deserialize_validates() {
        let ok: std::result::Result<UserId, _> = serde_json::from_str("\"alice\"");
        assert!(ok.is_ok());
        let bad: std::result::Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_item_id_display() {
        let id = ItemId::new("3f2a-song", "12");
        assert_eq!(id.to_string(), "3f2a-song-12");
        assert!(id.in_deck("3f2a-song"));
        assert!(!id.in_deck("3f2a"));
    }

    #[test]
    fn test_grade_values() {
        assert_eq!(Grade::Again.value(), 1.0);
        assert_eq!(Grade::Good.value(), 3.0);
        assert_eq!(Grade::Good.to_string(), "good");
    }

    #[test]
    fn test_grade_serialization() {
        assert_eq!(serde_json::to_string(&Grade::Again).unwrap(), "\"again\"");
        let g: Grade = serde_json::from_str("\"good\"").unwrap();
        assert_eq!(g, Grade::Good);
    }

    #[test]
    fn test_record_missing_seq_defaults_to_zero() {
        let json = r#"{
            "item_id": {"deck_id": "d", "phrase_id": "1"},
            "reps": 0, "lapses": 0, "stability": 0.0, "difficulty": 7.2102,
            "retrievability": 0.0,
            "last_review": "1970-01-01T00:00:00Z",
            "next_review": "1970-01-01T00:00:00Z",
            "last_interval": 0, "is_removed": false
        }"#;
        let record: LearningRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.seq, 0);
        assert!(record.is_unreviewed());
    }

    #[test]
    fn test_with_removed_resets_seq() {
        let json = r#"{
            "item_id": {"deck_id": "d", "phrase_id": "1"},
            "reps": 2, "lapses": 0, "stability": 3.0, "difficulty": 5.0,
            "retrievability": 0.9,
            "last_review": "2024-05-01T10:00:00Z",
            "next_review": "2024-05-04T10:00:00Z",
            "last_interval": 3, "is_removed": false, "seq": 9
        }"#;
        let record: LearningRecord = serde_json::from_str(json).unwrap();
        let suspended = record.with_removed(true);
        assert!(suspended.is_removed);
        assert_eq!(suspended.seq, 0);
        assert_eq!(suspended.last_review, record.last_review);
        assert_eq!(suspended.reps, 2);
    }
}
