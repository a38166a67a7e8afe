//! The Cadence scheduler.
//!
//! `Scheduler` ties the pure core rules to a learner's record store, the
//! deck registry, the phrase catalog and a clock. Every operation takes the
//! learner explicitly and reads the clock once, so one scheduler can serve
//! many learners from several threads.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::catalog::PhraseCatalog;
use crate::clock::Clock;
use crate::config::{Config, SchedulingConfig};
use crate::core::init::items_needing_seed;
use crate::core::{
    aggregate, apply_review, plan, resolve, restamp_review, seed_record, seed_records, DayBoundary,
    DeckInitStatus, DeckStatus, Grade, InitReport, ItemId, LearningRecord, ResolvedItemState,
    SessionBudget, StudyMode, StudySession, UserId,
};
use crate::error::{CadenceError, Result};
use crate::storage::{DeckEntry, DeckRegistry, LearningRecordStore};

/// A deck's catalog items and the latest record of each.
struct DeckSnapshot {
    items: Vec<ItemId>,
    latest: HashMap<ItemId, LearningRecord>,
}

/// Spaced-repetition scheduler over pluggable storage.
pub struct Scheduler<S, R, P, C> {
    store: S,
    registry: R,
    catalog: P,
    clock: C,
    config: SchedulingConfig,
    day: DayBoundary,
}

impl<S, R, P, C> Scheduler<S, R, P, C>
where
    S: LearningRecordStore,
    R: DeckRegistry,
    P: PhraseCatalog,
    C: Clock,
{
    /// Create a scheduler with default policy and the local day boundary.
    pub fn new(store: S, registry: R, catalog: P, clock: C) -> Self {
        Self {
            store,
            registry,
            catalog,
            clock,
            config: SchedulingConfig::default(),
            day: DayBoundary::local(),
        }
    }

    /// Apply the scheduling policy and day boundary from a loaded config.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_scheduling(config.scheduling)
            .with_day_boundary(config.day.boundary())
    }

    /// Replace the scheduling policy.
    pub fn with_scheduling(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the calendar day boundary.
    pub fn with_day_boundary(mut self, day: DayBoundary) -> Self {
        self.day = day;
        self
    }

    /// The active scheduling policy.
    pub fn scheduling(&self) -> &SchedulingConfig {
        &self.config
    }

    /// The active day boundary.
    pub fn day_boundary(&self) -> DayBoundary {
        self.day
    }

    fn snapshot(&self, deck_id: &str, user: &UserId) -> Result<DeckSnapshot> {
        let items = self.catalog.list_item_ids(deck_id)?;
        let latest = self.store.get_all_for_deck(user, deck_id)?;
        Ok(DeckSnapshot { items, latest })
    }

    fn ensure_in_catalog(&self, item_id: &ItemId) -> Result<()> {
        let items = self.catalog.list_item_ids(&item_id.deck_id)?;
        if items.contains(item_id) {
            Ok(())
        } else {
            Err(CadenceError::item_not_found(item_id.to_string()))
        }
    }

    /// Summary counts for the deck overview, bounded by `status_cap`.
    pub fn get_deck_status(&self, deck_id: &str, user: &UserId) -> Result<DeckStatus> {
        let snapshot = self.snapshot(deck_id, user)?;
        let status = aggregate(
            &snapshot.items,
            &snapshot.latest,
            self.clock.now(),
            self.day,
            self.config.status_cap,
        );
        tracing::debug!(
            user = %user,
            deck = deck_id,
            new = status.new_count,
            learning = status.learning_count,
            due = status.due_count,
            capped = status.capped,
            "computed deck status"
        );
        Ok(status)
    }

    /// Plan a study session with explicit limits.
    pub fn plan_session(
        &self,
        deck_id: &str,
        user: &UserId,
        total_cards: usize,
        max_new_cards: usize,
        mode: StudyMode,
    ) -> Result<StudySession> {
        let snapshot = self.snapshot(deck_id, user)?;
        Ok(plan(
            &snapshot.items,
            &snapshot.latest,
            self.clock.now(),
            self.day,
            total_cards,
            max_new_cards,
            mode,
        ))
    }

    /// Plan today's session the way the study page does.
    ///
    /// The mode switches to study-again once `study_again_threshold` items
    /// were reviewed today; otherwise the budget is the remaining daily new
    /// allowance plus everything in progress. Counts come from a full scan,
    /// not the capped overview.
    pub fn plan_today(&self, deck_id: &str, user: &UserId) -> Result<StudySession> {
        let snapshot = self.snapshot(deck_id, user)?;
        let now = self.clock.now();
        let status = aggregate(&snapshot.items, &snapshot.latest, now, self.day, u32::MAX);
        let mode = StudyMode::for_status(&status, self.config.study_again_threshold);
        let budget = SessionBudget::from_status(&status, self.config.daily_new_limit);

        tracing::debug!(
            user = %user,
            deck = deck_id,
            mode = mode.as_str(),
            total = budget.total_cards,
            max_new = budget.max_new_cards,
            "planning today's session"
        );

        Ok(plan(
            &snapshot.items,
            &snapshot.latest,
            now,
            self.day,
            budget.total_cards,
            budget.max_new_cards,
            mode,
        ))
    }

    /// Grade an item and persist the resulting record.
    ///
    /// Items without any record are treated as freshly seeded. Suspended
    /// items must be restored first.
    pub fn submit_review(
        &self,
        item_id: &ItemId,
        user: &UserId,
        grade: Grade,
    ) -> Result<LearningRecord> {
        self.ensure_in_catalog(item_id)?;
        let now = self.clock.now();

        let previous = self
            .store
            .get_latest(user, item_id)?
            .unwrap_or_else(|| seed_record(item_id.clone()));
        if previous.is_removed {
            return Err(CadenceError::invalid_record(format!(
                "item {} is suspended",
                item_id
            )));
        }

        let next = apply_review(&previous, grade, now, self.config.again_delay())?;
        let stored = self.store.append(user, &next)?;

        tracing::debug!(
            user = %user,
            item = %item_id,
            grade = grade.as_str(),
            interval = stored.last_interval,
            next_review = %stored.next_review,
            "recorded review"
        );

        self.touch_deck(user, &item_id.deck_id, now);
        Ok(stored)
    }

    /// Record a same-day drill of an item already reviewed.
    ///
    /// Only the review time moves; memory strength and the scheduled next
    /// review are kept.
    pub fn submit_study_again_review(
        &self,
        item_id: &ItemId,
        user: &UserId,
    ) -> Result<LearningRecord> {
        self.ensure_in_catalog(item_id)?;
        let now = self.clock.now();

        let previous = self
            .store
            .get_latest(user, item_id)?
            .filter(|record| !record.is_unreviewed())
            .ok_or_else(|| {
                CadenceError::invalid_record(format!("item {} has not been reviewed yet", item_id))
            })?;
        if previous.is_removed {
            return Err(CadenceError::invalid_record(format!(
                "item {} is suspended",
                item_id
            )));
        }

        let stored = self.store.append(user, &restamp_review(&previous, now))?;
        tracing::debug!(user = %user, item = %item_id, "recorded study-again drill");

        self.touch_deck(user, &item_id.deck_id, now);
        Ok(stored)
    }

    /// Best-effort `last_practiced` update; the review is already stored.
    fn touch_deck(&self, user: &UserId, deck_id: &str, now: DateTime<Utc>) {
        if let Err(e) = self.registry.touch(user, deck_id, now) {
            tracing::warn!(user = %user, deck = deck_id, "failed to update last practiced: {}", e);
        }
    }

    /// Seed zero records for every deck item without one and register the
    /// deck as active.
    ///
    /// Both halves always run. If either fails the call returns an error
    /// after attempting both; calling again finishes the job without
    /// reseeding anything.
    pub fn ensure_deck_initialized(&self, deck_id: &str, user: &UserId) -> Result<InitReport> {
        let items = self.catalog.list_item_ids(deck_id)?;
        let now = self.clock.now();

        let seeding = self.seed_missing(deck_id, user, &items);
        let registration = self.registry.register(user, deck_id, now);

        match (seeding, registration) {
            (Ok((seeded, already_initialized)), Ok(deck_registered)) => {
                tracing::info!(
                    user = %user,
                    deck = deck_id,
                    seeded,
                    already_initialized,
                    deck_registered,
                    "deck initialized"
                );
                Ok(InitReport {
                    seeded,
                    already_initialized,
                    deck_registered,
                })
            }
            (Ok((seeded, _)), Err(e)) => {
                tracing::warn!(
                    user = %user,
                    deck = deck_id,
                    seeded,
                    "deck seeded but registration failed: {}",
                    e
                );
                Err(CadenceError::initialization(
                    seeded,
                    format!("registering deck {} failed: {}", deck_id, e),
                ))
            }
            (Err(e), registration) => {
                match registration {
                    Ok(_) => tracing::warn!(
                        user = %user,
                        deck = deck_id,
                        "deck registered but seeding failed: {}",
                        e
                    ),
                    Err(reg) => tracing::warn!(
                        user = %user,
                        deck = deck_id,
                        "deck seeding failed: {}; registration failed: {}",
                        e,
                        reg
                    ),
                }
                Err(e)
            }
        }
    }

    /// Returns `(seeded, already_initialized)`.
    fn seed_missing(
        &self,
        deck_id: &str,
        user: &UserId,
        items: &[ItemId],
    ) -> Result<(usize, usize)> {
        let existing: HashSet<ItemId> = self
            .store
            .get_all_for_deck(user, deck_id)?
            .into_keys()
            .collect();
        let records = seed_records(items, &existing);
        let unique = items.iter().collect::<HashSet<_>>().len();
        let already_initialized = unique - records.len();
        let seeded = self.store.append_bulk(user, &records)?;
        Ok((seeded, already_initialized))
    }

    /// Whether every catalog item of the deck has a record.
    pub fn check_deck_initialization(
        &self,
        deck_id: &str,
        user: &UserId,
    ) -> Result<DeckInitStatus> {
        let snapshot = self.snapshot(deck_id, user)?;
        let existing: HashSet<ItemId> = snapshot.latest.into_keys().collect();
        let status = DeckInitStatus::compute(&snapshot.items, &existing);
        if !status.fully_initialized {
            tracing::debug!(
                user = %user,
                deck = deck_id,
                missing = items_needing_seed(&snapshot.items, &existing).len(),
                "deck not fully initialized"
            );
        }
        Ok(status)
    }

    /// Items of the deck reviewed today, in catalog order.
    pub fn cards_studied_today(&self, deck_id: &str, user: &UserId) -> Result<Vec<ItemId>> {
        let snapshot = self.snapshot(deck_id, user)?;
        let now = self.clock.now();
        Ok(snapshot
            .items
            .into_iter()
            .filter(|id| resolve(snapshot.latest.get(id), now, self.day).studied_today)
            .collect())
    }

    /// Suspend an item from scheduling.
    ///
    /// Returns the appended record, or `None` if it was already suspended.
    pub fn suspend_item(&self, item_id: &ItemId, user: &UserId) -> Result<Option<LearningRecord>> {
        self.set_removed(item_id, user, true)
    }

    /// Bring a suspended item back into scheduling.
    ///
    /// Returns the appended record, or `None` if it was not suspended.
    pub fn restore_item(&self, item_id: &ItemId, user: &UserId) -> Result<Option<LearningRecord>> {
        self.set_removed(item_id, user, false)
    }

    fn set_removed(
        &self,
        item_id: &ItemId,
        user: &UserId,
        is_removed: bool,
    ) -> Result<Option<LearningRecord>> {
        self.ensure_in_catalog(item_id)?;
        let latest = self
            .store
            .get_latest(user, item_id)?
            .unwrap_or_else(|| seed_record(item_id.clone()));
        if latest.is_removed == is_removed {
            return Ok(None);
        }

        let stored = self.store.append(user, &latest.with_removed(is_removed))?;
        tracing::info!(
            user = %user,
            item = %item_id,
            suspended = is_removed,
            "changed item suspension"
        );
        Ok(Some(stored))
    }

    /// The learner's registered decks, most recently practiced first.
    pub fn list_decks(&self, user: &UserId) -> Result<Vec<DeckEntry>> {
        self.registry.list(user)
    }

    /// Resolved state of a single item.
    pub fn item_state(&self, item_id: &ItemId, user: &UserId) -> Result<ResolvedItemState> {
        self.ensure_in_catalog(item_id)?;
        let latest = self.store.get_latest(user, item_id)?;
        Ok(resolve(latest.as_ref(), self.clock.now(), self.day))
    }
}
