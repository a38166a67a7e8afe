//! Unified error types for Cadence.
//!
//! Scheduling functions are pure and only fail on malformed input. Store,
//! catalog and configuration failures are propagated to the caller unchanged;
//! Cadence never retries on its own.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    /// I/O errors from file-backed stores and catalogs.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Learning record store or deck registry failures.
    #[error("store error: {message}")]
    Store { message: String },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// A learning record or memory state that violates the model's preconditions.
    #[error("invalid learning record: {message}")]
    InvalidRecord { message: String },

    /// Missing or malformed learner identifier.
    #[error("invalid user id: {message}")]
    InvalidUser { message: String },

    /// Phrase catalog errors.
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// The catalog has no deck with this id.
    #[error("deck not found: {deck_id}")]
    DeckNotFound { deck_id: String },

    /// The deck exists but does not contain this item.
    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Deck initialization finished only partially. Re-running it is safe.
    #[error("deck initialization incomplete ({seeded} items seeded): {message}")]
    Initialization { seeded: usize, message: String },
}

/// A specialized Result type for Cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;

impl CadenceError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create an invalid user error.
    pub fn invalid_user(message: impl Into<String>) -> Self {
        Self::InvalidUser {
            message: message.into(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a deck not found error.
    pub fn deck_not_found(deck_id: impl Into<String>) -> Self {
        Self::DeckNotFound {
            deck_id: deck_id.into(),
        }
    }

    /// Create an item not found error.
    pub fn item_not_found(item_id: impl Into<String>) -> Self {
        Self::ItemNotFound {
            item_id: item_id.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a partial initialization error.
    pub fn initialization(seeded: usize, message: impl Into<String>) -> Self {
        Self::Initialization {
            seeded,
            message: message.into(),
        }
    }

    /// Whether re-running the failed operation may succeed.
    ///
    /// Malformed records and user ids will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Store { .. } | Self::Initialization { .. }
        )
    }
}

impl From<io::Error> for CadenceError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the Cadence CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed.
    pub const ERROR: i32 = 1;

    /// The command panicked.
    pub const CRASH: i32 = 3;
}
