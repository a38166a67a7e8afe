//! CLI commands for Cadence.
//!
//! Each command wraps a [`Scheduler`] and produces a serializable output
//! that renders either as JSON or as human-readable text:
//! - **Deck commands**: init, status, plan
//! - **Review commands**: review
//! - **Learner commands**: decks

pub mod decks;
pub mod init;
pub mod plan;
pub mod review;
pub mod status;

pub use decks::DecksCommand;
pub use init::InitCommand;
pub use plan::PlanCommand;
pub use review::ReviewCommand;
pub use status::StatusCommand;

use crate::catalog::FileCatalog;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{CadenceError, Result};
use crate::scheduler::Scheduler;
use crate::storage::{FileDeckRegistry, FileRecordStore};

/// The scheduler the command line runs against.
pub type FileScheduler = Scheduler<FileRecordStore, FileDeckRegistry, FileCatalog, SystemClock>;

/// Open the file-backed scheduler described by `config`.
pub fn open_scheduler(config: &Config) -> Result<FileScheduler> {
    let data_dir = config.data_dir().ok_or_else(|| {
        CadenceError::config("Could not determine data directory (no home directory)")
    })?;
    let catalog_dir = config.catalog_dir().ok_or_else(|| {
        CadenceError::config("Could not determine catalog directory (no home directory)")
    })?;

    let scheduler = Scheduler::new(
        FileRecordStore::with_dir(&data_dir)?,
        FileDeckRegistry::with_dir(&data_dir)?,
        FileCatalog::with_dir(catalog_dir),
        SystemClock,
    );
    Ok(scheduler.with_config(config))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::clock::FixedClock;
    use crate::core::{DayBoundary, UserId};
    use crate::storage::{MemoryDeckRegistry, MemoryRecordStore};

    pub type TestScheduler =
        Scheduler<Arc<MemoryRecordStore>, Arc<MemoryDeckRegistry>, Arc<MemoryCatalog>, Arc<FixedClock>>;

    pub fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Scheduler over a three-phrase deck `song`, pinned at 09:00 UTC.
    pub fn test_scheduler() -> (TestScheduler, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(at("2024-05-10T09:00:00Z")));
        let catalog = Arc::new(MemoryCatalog::new().with_deck("song", ["1", "2", "3"]));
        let scheduler = Scheduler::new(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryDeckRegistry::new()),
            catalog,
            Arc::clone(&clock),
        )
        .with_day_boundary(DayBoundary::utc());
        (scheduler, clock)
    }

    pub fn learner() -> UserId {
        UserId::new("learner").unwrap()
    }

    #[test]
    fn test_open_scheduler_uses_configured_dirs() {
        let temp = TempDir::new().unwrap();
        let catalog_dir = temp.path().join("decks");
        std::fs::create_dir_all(&catalog_dir).unwrap();
        std::fs::write(
            catalog_dir.join("song.toml"),
            "[[phrases]]\nid = \"1\"\n\n[[phrases]]\nid = \"2\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.storage.data_dir = Some(temp.path().join("data"));
        config.storage.catalog_dir = Some(catalog_dir);
        config.day.utc_offset_minutes = Some(0);

        let scheduler = open_scheduler(&config).unwrap();
        let report = scheduler.ensure_deck_initialized("song", &learner()).unwrap();

        assert_eq!(report.seeded, 2);
        assert!(temp.path().join("data").join("users").join("learner").is_dir());
        assert_eq!(scheduler.day_boundary(), DayBoundary::utc());
    }
}
