//! Record resolution for Cadence.
//!
//! Folds the append-only record stream of an item into its current state.
//!
//! Resolution rules:
//! 1. No record, or a record never reviewed → new (and due)
//! 2. Latest record suspended → suspended, never new or due
//! 3. Reviewed on the same calendar day as `now` → studied today (learning)
//! 4. Otherwise → due when `next_review <= now`
//!
//! "Same calendar day" is evaluated in the caller's local day, expressed as a
//! fixed UTC offset, so reviews near midnight land on the learner's own date.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{ItemId, LearningRecord};

/// Calendar day boundary used for "studied today" decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    /// Days start at midnight UTC.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Days start at midnight of the machine's current local offset.
    pub fn local() -> Self {
        Self {
            offset: Local::now().offset().fix(),
        }
    }

    /// Days start at midnight of the given offset east of UTC.
    ///
    /// Returns `None` when the offset is out of range (more than ±24h).
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
    }

    /// The offset east of UTC, in minutes.
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Calendar date of an instant in this day boundary.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Whether two instants fall on the same calendar day.
    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.date_of(a) == self.date_of(b)
    }

    /// The instant at which the day containing `instant` started.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        // A fixed offset has no gaps, so local midnight always exists.
        self.date_of(instant)
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(instant)
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::local()
    }
}

/// Derived scheduling state of one item. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedItemState {
    /// Never reviewed.
    pub is_new: bool,
    /// Reviewed today; its next review is still pending.
    pub is_learning: bool,
    /// Eligible for a normal study session.
    pub is_due: bool,
    /// Last reviewed on the current calendar day.
    pub studied_today: bool,
    /// Suspended via the soft-delete marker.
    pub is_suspended: bool,
}

impl ResolvedItemState {
    fn new_item() -> Self {
        Self {
            is_new: true,
            is_due: true,
            ..Default::default()
        }
    }

    /// Previously reviewed and due again.
    pub fn is_due_review(&self) -> bool {
        self.is_due && !self.is_new
    }
}

/// Resolve the current state of an item from its latest record.
pub fn resolve(
    latest: Option<&LearningRecord>,
    now: DateTime<Utc>,
    day: DayBoundary,
) -> ResolvedItemState {
    let Some(record) = latest else {
        return ResolvedItemState::new_item();
    };

    if record.is_removed {
        return ResolvedItemState {
            is_suspended: true,
            ..Default::default()
        };
    }

    if record.is_unreviewed() {
        return ResolvedItemState::new_item();
    }

    if day.same_day(record.last_review, now) {
        return ResolvedItemState {
            is_learning: true,
            studied_today: true,
            ..Default::default()
        };
    }

    ResolvedItemState {
        is_due: record.is_due_at(now),
        ..Default::default()
    }
}

/// Whether `candidate` supersedes `current` as the latest record of an item.
///
/// Later `last_review` wins; equal timestamps fall back to the store's
/// append sequence.
fn supersedes(candidate: &LearningRecord, current: &LearningRecord) -> bool {
    (candidate.last_review, candidate.seq) > (current.last_review, current.seq)
}

/// Fold the records of a single item into its most recent one.
pub fn latest_record<'a, I>(records: I) -> Option<&'a LearningRecord>
where
    I: IntoIterator<Item = &'a LearningRecord>,
{
    records.into_iter().fold(None, |latest, record| match latest {
        Some(current) if !supersedes(record, current) => Some(current),
        _ => Some(record),
    })
}

/// Fold a mixed stream of records into the latest record per item.
pub fn latest_by_item<I>(records: I) -> HashMap<ItemId, LearningRecord>
where
    I: IntoIterator<Item = LearningRecord>,
{
    let mut latest: HashMap<ItemId, LearningRecord> = HashMap::new();
    for record in records {
        match latest.get(&record.item_id) {
            Some(current) if !supersedes(&record, current) => {}
            _ => {
                latest.insert(record.item_id.clone(), record);
            }
        }
    }
    latest
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::init::seed_record;
    use chrono::Duration;

    pub(crate) fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    /// A reviewed record for tests.
    pub(crate) fn reviewed_record(
        item: &ItemId,
        last_review: DateTime<Utc>,
        next_review: DateTime<Utc>,
    ) -> LearningRecord {
        LearningRecord {
            item_id: item.clone(),
            reps: 1,
            lapses: 0,
            stability: 2.0,
            difficulty: 5.0,
            retrievability: 0.0,
            last_review,
            next_review,
            last_interval: 1,
            is_removed: false,
            seq: 0,
        }
    }

    fn item() -> ItemId {
        ItemId::new("song", "1")
    }

    #[test]
    fn test_no_record_is_new() {
        let state = resolve(None, ts("2024-05-01T12:00:00Z"), DayBoundary::utc());
        assert!(state.is_new);
        assert!(state.is_due);
        assert!(!state.is_learning);
        assert!(!state.studied_today);
    }

    #[test]
    fn test_seed_record_is_new() {
        let seed = seed_record(item());
        let state = resolve(Some(&seed), ts("2024-05-01T12:00:00Z"), DayBoundary::utc());
        assert!(state.is_new);
        assert!(state.is_due);
    }

    #[test]
    fn test_reviewed_today_is_learning() {
        let now = ts("2024-05-01T18:00:00Z");
        let record = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), now - Duration::hours(1));
        let state = resolve(Some(&record), now, DayBoundary::utc());
        assert!(state.studied_today);
        assert!(state.is_learning);
        // Even though next_review has passed, today's items are not re-selected.
        assert!(!state.is_due);
        assert!(!state.is_new);
    }

    #[test]
    fn test_reviewed_earlier_and_due() {
        let now = ts("2024-05-03T09:00:00Z");
        let record = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), ts("2024-05-02T08:00:00Z"));
        let state = resolve(Some(&record), now, DayBoundary::utc());
        assert!(state.is_due);
        assert!(state.is_due_review());
        assert!(!state.is_learning);
        assert!(!state.studied_today);
    }

    #[test]
    fn test_reviewed_earlier_not_yet_due() {
        let now = ts("2024-05-03T09:00:00Z");
        let record = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), ts("2024-05-07T08:00:00Z"));
        let state = resolve(Some(&record), now, DayBoundary::utc());
        assert!(!state.is_due);
        assert!(!state.is_new);
        assert!(!state.is_learning);
    }

    #[test]
    fn test_due_exactly_at_next_review() {
        let now = ts("2024-05-03T09:00:00Z");
        let record = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), now);
        assert!(resolve(Some(&record), now, DayBoundary::utc()).is_due);
    }

    #[test]
    fn test_suspended_record() {
        let now = ts("2024-05-03T09:00:00Z");
        let record = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), ts("2024-05-02T08:00:00Z"))
            .with_removed(true);
        let state = resolve(Some(&record), now, DayBoundary::utc());
        assert!(state.is_suspended);
        assert!(!state.is_due);
        assert!(!state.is_new);

        let seed = seed_record(item()).with_removed(true);
        assert!(resolve(Some(&seed), now, DayBoundary::utc()).is_suspended);
    }

    #[test]
    fn test_day_boundary_uses_local_offset() {
        // 23:30 UTC on May 1 is already May 2 at UTC+2.
        let last_review = ts("2024-05-01T23:30:00Z");
        let now = ts("2024-05-02T08:00:00Z");
        let record = reviewed_record(&item(), last_review, ts("2024-05-02T23:30:00Z"));

        let utc = resolve(Some(&record), now, DayBoundary::utc());
        assert!(!utc.studied_today);

        let plus_two = DayBoundary::from_offset_minutes(120).unwrap();
        let local = resolve(Some(&record), now, plus_two);
        assert!(local.studied_today);
    }

    #[test]
    fn test_day_boundary_from_offset_minutes() {
        assert_eq!(
            DayBoundary::from_offset_minutes(-300).unwrap().offset_minutes(),
            -300
        );
        assert!(DayBoundary::from_offset_minutes(24 * 60).is_none());
        assert!(DayBoundary::from_offset_minutes(i32::MAX).is_none());
    }

    #[test]
    fn test_start_of_day() {
        let day = DayBoundary::from_offset_minutes(-300).unwrap();
        let start = day.start_of_day(ts("2024-05-02T03:00:00Z"));
        // 03:00 UTC is 22:00 on May 1 at UTC-5; that day began at 05:00 UTC.
        assert_eq!(start, ts("2024-05-01T05:00:00Z"));
    }

    #[test]
    fn test_latest_record_picks_latest_review() {
        let older = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), ts("2024-05-02T08:00:00Z"));
        let newer = reviewed_record(&item(), ts("2024-05-02T08:00:00Z"), ts("2024-05-05T08:00:00Z"));
        let records = vec![newer.clone(), older.clone()];
        assert_eq!(latest_record(&records), Some(&newer));
        let records = vec![older, newer.clone()];
        assert_eq!(latest_record(&records), Some(&newer));
    }

    #[test]
    fn test_latest_record_breaks_ties_by_seq() {
        let mut first = reviewed_record(&item(), ts("2024-05-01T08:00:00Z"), ts("2024-05-02T08:00:00Z"));
        first.seq = 4;
        let mut second = first.with_removed(true);
        second.seq = 5;
        let records = vec![second.clone(), first];
        assert_eq!(latest_record(&records), Some(&second));
    }

    #[test]
    fn test_latest_record_empty() {
        let records: Vec<LearningRecord> = Vec::new();
        assert!(latest_record(&records).is_none());
    }

    #[test]
    fn test_latest_by_item() {
        let a = ItemId::new("song", "a");
        let b = ItemId::new("song", "b");
        let records = vec![
            seed_record(a.clone()),
            seed_record(b.clone()),
            reviewed_record(&a, ts("2024-05-01T08:00:00Z"), ts("2024-05-02T08:00:00Z")),
        ];
        let latest = latest_by_item(records);
        assert_eq!(latest.len(), 2);
        assert!(!latest[&a].is_unreviewed());
        assert!(latest[&b].is_unreviewed());
    }
}
