//! Study session planning for Cadence.
//!
//! A normal session takes every previously reviewed item that is due, then
//! tops up with never-reviewed items up to the new-card budget, and truncates
//! the whole queue to the requested size. A study-again session replays the
//! items already reviewed today. Both keep catalog order.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{ItemId, LearningRecord};
use crate::core::resolve::{resolve, DayBoundary};
use crate::core::status::DeckStatus;

/// Which rule set assembled a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    /// Due reviews plus a budget of new items.
    #[default]
    Normal,
    /// Same-day re-drill of items already reviewed today.
    StudyAgain,
}

impl StudyMode {
    /// Pick the mode the way the study page does: once the learner has
    /// reviewed `threshold` items today, offer a study-again session.
    pub fn for_status(status: &DeckStatus, threshold: u32) -> Self {
        if status.studied_today >= threshold {
            Self::StudyAgain
        } else {
            Self::Normal
        }
    }

    /// Get the mode name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::StudyAgain => "study_again",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session size limits derived from a deck's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBudget {
    /// Maximum queue length.
    pub total_cards: usize,
    /// Maximum never-reviewed items in the queue.
    pub max_new_cards: usize,
}

impl SessionBudget {
    /// Today's budget: new items are limited by what is left of the daily
    /// allowance, and the queue holds those plus everything in progress.
    pub fn from_status(status: &DeckStatus, daily_new_limit: u32) -> Self {
        let max_new_cards = daily_new_limit
            .saturating_sub(status.studied_today)
            .min(status.new_count) as usize;
        let total_cards =
            max_new_cards + status.learning_count as usize + status.due_count as usize;
        Self {
            total_cards,
            max_new_cards,
        }
    }
}

/// An ordered, single-use queue of items for one sitting.
///
/// Iterating consumes the session; plan a new one to start over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    mode: StudyMode,
    items: Vec<ItemId>,
}

impl StudySession {
    /// Wrap an already ordered queue.
    pub fn new(mode: StudyMode, items: Vec<ItemId>) -> Self {
        Self { mode, items }
    }

    /// The mode that produced this session.
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    /// Items in study order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Number of items in the session.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is left to study.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for StudySession {
    type Item = ItemId;
    type IntoIter = std::vec::IntoIter<ItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Assemble the study queue for one deck.
///
/// `items` is the deck in catalog order and `latest` maps items to their
/// latest record. `total_cards` and `max_new_cards` only apply to
/// [`StudyMode::Normal`].
pub fn plan(
    items: &[ItemId],
    latest: &HashMap<ItemId, LearningRecord>,
    now: DateTime<Utc>,
    day: DayBoundary,
    total_cards: usize,
    max_new_cards: usize,
    mode: StudyMode,
) -> StudySession {
    let classified = items
        .iter()
        .map(|id| (id, resolve(latest.get(id), now, day)));

    let queue: Vec<ItemId> = match mode {
        StudyMode::StudyAgain => classified
            .filter(|(_, state)| state.studied_today && !state.is_suspended)
            .map(|(id, _)| id.clone())
            .collect(),
        StudyMode::Normal => {
            let mut due_reviewed = Vec::new();
            let mut true_new = Vec::new();
            for (id, state) in classified.filter(|(_, state)| state.is_due) {
                if state.is_new {
                    true_new.push(id.clone());
                } else {
                    due_reviewed.push(id.clone());
                }
            }

            let new_budget = true_new.len().min(max_new_cards);
            due_reviewed
                .into_iter()
                .chain(true_new.into_iter().take(new_budget))
                .take(total_cards)
                .collect()
        }
    };

    tracing::debug!(
        mode = mode.as_str(),
        catalog = items.len(),
        planned = queue.len(),
        "planned study session"
    );

    StudySession::new(mode, queue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::init::seed_record;
    use crate::core::resolve::tests::{reviewed_record, ts};
    use chrono::Duration;

    fn deck(n: usize) -> Vec<ItemId> {
        (0..n).map(|i| ItemId::new("song", i.to_string())).collect()
    }

    fn now() -> DateTime<Utc> {
        ts("2024-05-10T12:00:00Z")
    }

    fn due(item: &ItemId) -> LearningRecord {
        reviewed_record(item, now() - Duration::days(3), now() - Duration::days(1))
    }

    fn not_yet_due(item: &ItemId) -> LearningRecord {
        reviewed_record(item, now() - Duration::days(3), now() + Duration::days(3))
    }

    fn studied_today(item: &ItemId) -> LearningRecord {
        reviewed_record(item, now() - Duration::hours(2), now() + Duration::days(1))
    }

    fn index(records: Vec<LearningRecord>) -> HashMap<ItemId, LearningRecord> {
        records.into_iter().map(|r| (r.item_id.clone(), r)).collect()
    }

    fn plan_normal(
        items: &[ItemId],
        latest: &HashMap<ItemId, LearningRecord>,
        total: usize,
        max_new: usize,
    ) -> Vec<ItemId> {
        plan(items, latest, now(), DayBoundary::utc(), total, max_new, StudyMode::Normal)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_three_new_items_capped_to_two() {
        let items = deck(3);
        let queue = plan_normal(&items, &HashMap::new(), 10, 2);
        assert_eq!(queue, vec![items[0].clone(), items[1].clone()]);
    }

    #[test]
    fn test_seeded_items_count_as_new() {
        let items = deck(3);
        let latest = index(items.iter().cloned().map(seed_record).collect());
        let queue = plan_normal(&items, &latest, 10, 5);
        assert_eq!(queue, items);
    }

    #[test]
    fn test_due_reviews_before_new_items() {
        let items = deck(4);
        // Catalog: new, due, new, due
        let latest = index(vec![due(&items[1]), due(&items[3])]);
        let queue = plan_normal(&items, &latest, 10, 10);
        assert_eq!(
            queue,
            vec![
                items[1].clone(),
                items[3].clone(),
                items[0].clone(),
                items[2].clone()
            ]
        );
    }

    #[test]
    fn test_total_cards_truncates() {
        let items = deck(4);
        let latest = index(vec![due(&items[1]), due(&items[3])]);
        let queue = plan_normal(&items, &latest, 3, 10);
        assert_eq!(queue, vec![items[1].clone(), items[3].clone(), items[0].clone()]);
    }

    #[test]
    fn test_not_due_and_studied_today_excluded() {
        let items = deck(3);
        let latest = index(vec![
            not_yet_due(&items[0]),
            studied_today(&items[1]),
            due(&items[2]),
        ]);
        let queue = plan_normal(&items, &latest, 10, 10);
        assert_eq!(queue, vec![items[2].clone()]);
    }

    #[test]
    fn test_suspended_items_excluded() {
        let items = deck(3);
        let latest = index(vec![
            due(&items[0]).with_removed(true),
            seed_record(items[1].clone()).with_removed(true),
            studied_today(&items[2]).with_removed(true),
        ]);
        assert!(plan_normal(&items, &latest, 10, 10).is_empty());
        let again = plan(&items, &latest, now(), DayBoundary::utc(), 10, 10, StudyMode::StudyAgain);
        assert!(again.is_empty());
    }

    #[test]
    fn test_empty_session_is_valid() {
        let items = deck(2);
        let latest = index(vec![not_yet_due(&items[0]), not_yet_due(&items[1])]);
        let session = plan(&items, &latest, now(), DayBoundary::utc(), 10, 10, StudyMode::Normal);
        assert!(session.is_empty());
        assert_eq!(session.mode(), StudyMode::Normal);
    }

    #[test]
    fn test_study_again_takes_todays_items_untruncated() {
        let items = deck(5);
        let latest = index(vec![
            studied_today(&items[4]),
            studied_today(&items[0]),
            due(&items[1]),
            studied_today(&items[2]),
        ]);
        let session = plan(&items, &latest, now(), DayBoundary::utc(), 1, 0, StudyMode::StudyAgain);
        assert_eq!(session.mode(), StudyMode::StudyAgain);
        assert_eq!(
            session.items(),
            &[items[0].clone(), items[2].clone(), items[4].clone()]
        );
    }

    #[test]
    fn test_again_reviewed_today_only_in_study_again() {
        let items = deck(2);
        let mut record = studied_today(&items[0]);
        // Again grade: due five minutes after the review.
        record.next_review = record.last_review + Duration::minutes(5);
        let latest = index(vec![record]);

        let normal = plan_normal(&items, &latest, 10, 0);
        assert!(normal.is_empty());

        let again = plan(&items, &latest, now(), DayBoundary::utc(), 10, 0, StudyMode::StudyAgain);
        assert_eq!(again.items(), &[items[0].clone()]);
    }

    #[test]
    fn test_session_budget_from_status() {
        let status = DeckStatus {
            new_count: 15,
            learning_count: 2,
            due_count: 4,
            studied_today: 8,
            capped: false,
        };
        let budget = SessionBudget::from_status(&status, 20);
        assert_eq!(budget.max_new_cards, 12);
        assert_eq!(budget.total_cards, 18);

        let exhausted = DeckStatus {
            studied_today: 25,
            ..status
        };
        assert_eq!(SessionBudget::from_status(&exhausted, 20).max_new_cards, 0);
    }

    #[test]
    fn test_mode_for_status() {
        let mut status = DeckStatus::default();
        status.studied_today = 19;
        assert_eq!(StudyMode::for_status(&status, 20), StudyMode::Normal);
        status.studied_today = 20;
        assert_eq!(StudyMode::for_status(&status, 20), StudyMode::StudyAgain);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Kind {
            Missing,
            Seeded,
            Due,
            NotDue,
            Today,
        }

        fn arb_kind() -> impl Strategy<Value = Kind> {
            prop_oneof![
                Just(Kind::Missing),
                Just(Kind::Seeded),
                Just(Kind::Due),
                Just(Kind::NotDue),
                Just(Kind::Today),
            ]
        }

        fn build(kinds: &[Kind]) -> (Vec<ItemId>, HashMap<ItemId, LearningRecord>) {
            let items = deck(kinds.len());
            let mut latest = HashMap::new();
            for (id, kind) in items.iter().zip(kinds) {
                let record = match kind {
                    Kind::Missing => continue,
                    Kind::Seeded => seed_record(id.clone()),
                    Kind::Due => due(id),
                    Kind::NotDue => not_yet_due(id),
                    Kind::Today => studied_today(id),
                };
                latest.insert(id.clone(), record);
            }
            (items, latest)
        }

        proptest! {
            // Property: new items in a normal session never exceed the cap
            #[test]
            fn prop_new_cap_obeyed(
                kinds in prop::collection::vec(arb_kind(), 0..40),
                total in 0usize..50,
                max_new in 0usize..20,
            ) {
                let (items, latest) = build(&kinds);
                let queue = plan_normal(&items, &latest, total, max_new);
                let new_count = queue
                    .iter()
                    .filter(|id| resolve(latest.get(*id), now(), DayBoundary::utc()).is_new)
                    .count();
                prop_assert!(new_count <= max_new);
                prop_assert!(queue.len() <= total);
            }

            // Property: no new item precedes a due review
            #[test]
            fn prop_due_before_new(
                kinds in prop::collection::vec(arb_kind(), 0..40),
                total in 0usize..50,
                max_new in 0usize..20,
            ) {
                let (items, latest) = build(&kinds);
                let queue = plan_normal(&items, &latest, total, max_new);
                let flags: Vec<bool> = queue
                    .iter()
                    .map(|id| resolve(latest.get(id), now(), DayBoundary::utc()).is_new)
                    .collect();
                if let Some(first_new) = flags.iter().position(|is_new| *is_new) {
                    prop_assert!(flags[first_new..].iter().all(|is_new| *is_new));
                }
            }

            // Property: each group keeps catalog order
            #[test]
            fn prop_catalog_order_within_groups(
                kinds in prop::collection::vec(arb_kind(), 0..40),
            ) {
                let (items, latest) = build(&kinds);
                let queue = plan_normal(&items, &latest, usize::MAX, usize::MAX);
                let position = |id: &ItemId| items.iter().position(|i| i == id).unwrap();
                let flags: Vec<bool> = queue
                    .iter()
                    .map(|id| resolve(latest.get(id), now(), DayBoundary::utc()).is_new)
                    .collect();
                for pair in queue.iter().zip(flags.iter()).collect::<Vec<_>>().windows(2) {
                    let ((a, a_new), (b, b_new)) = (pair[0], pair[1]);
                    if a_new == b_new {
                        prop_assert!(position(a) < position(b));
                    }
                }
            }
        }
    }
}
