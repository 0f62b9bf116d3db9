//! Due-status classification and due-date ordering.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::bucket::parse_instant;
use crate::types::{DatedItem, DueStatus};

const MS_PER_DAY: i64 = 86_400_000;

/// Anything due within this many days (after tomorrow) counts as "due soon"
pub const SOON_WINDOW_DAYS: i64 = 3;

/// Whole days from `now` until `due`, rounded towards the past.
/// Any negative remainder already counts as a day late.
pub fn diff_days(now: DateTime<Utc>, due: DateTime<Utc>) -> i64 {
    (due - now).num_milliseconds().div_euclid(MS_PER_DAY)
}

/// Bucket a due instant relative to now
pub fn classify(now: DateTime<Utc>, due: DateTime<Utc>) -> DueStatus {
    match diff_days(now, due) {
        d if d < 0 => DueStatus::Overdue,
        0 => DueStatus::DueToday,
        1 => DueStatus::DueTomorrow,
        d if d <= SOON_WINDOW_DAYS => DueStatus::DueSoon,
        _ => DueStatus::Assigned,
    }
}

/// Items ordered by due instant, earliest first.
///
/// The sort is stable: equal instants keep input order, and items whose
/// date does not parse are moved to the end in input order.
pub fn sort_by_due<'a, Tz: TimeZone>(items: &'a [DatedItem], zone: &Tz) -> Vec<&'a DatedItem> {
    keyed_by_due(items, zone)
        .into_iter()
        .map(|(_, _, item)| item)
        .collect()
}

fn keyed_by_due<'a, Tz: TimeZone>(
    items: &'a [DatedItem],
    zone: &Tz,
) -> Vec<(usize, Option<DateTime<Utc>>, &'a DatedItem)> {
    let mut keyed: Vec<_> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (index, parse_instant(&item.due_date, zone), item))
        .collect();
    keyed.sort_by_key(|(_, due, _)| (due.is_none(), *due));
    keyed
}

/// A dated item together with its classification
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry<'a> {
    /// Position of the item in the input collection
    #[serde(skip)]
    pub index: usize,
    pub item: &'a DatedItem,
    pub due: DateTime<Utc>,
    pub status: DueStatus,
    pub diff_days: i64,
}

/// Classify every parseable item, in due-date order
pub fn annotate<'a, Tz: TimeZone>(
    items: &'a [DatedItem],
    now: DateTime<Utc>,
    zone: &Tz,
) -> Vec<StatusEntry<'a>> {
    keyed_by_due(items, zone)
        .into_iter()
        .filter_map(|(index, due, item)| {
            due.map(|due| StatusEntry {
                index,
                item,
                due,
                status: classify(now, due),
                diff_days: diff_days(now, due),
            })
        })
        .collect()
}

/// Per-status counts for badges and dashboards
#[derive(Debug, Clone, Copy, Default, Serialize, Eq, PartialEq)]
pub struct StatusSummary {
    pub overdue: usize,
    pub due_today: usize,
    pub due_tomorrow: usize,
    pub due_soon: usize,
    pub assigned: usize,
    /// Items without a usable due date
    pub undated: usize,
}

impl StatusSummary {
    pub fn from_items<Tz: TimeZone>(items: &[DatedItem], now: DateTime<Utc>, zone: &Tz) -> Self {
        let mut summary = StatusSummary::default();
        for item in items {
            match parse_instant(&item.due_date, zone) {
                Some(due) => summary.record(classify(now, due)),
                None => summary.undated += 1,
            }
        }
        summary
    }

    fn record(&mut self, status: DueStatus) {
        match status {
            DueStatus::Overdue => self.overdue += 1,
            DueStatus::DueToday => self.due_today += 1,
            DueStatus::DueTomorrow => self.due_tomorrow += 1,
            DueStatus::DueSoon => self.due_soon += 1,
            DueStatus::Assigned => self.assigned += 1,
        }
    }

    pub fn count(&self, status: DueStatus) -> usize {
        match status {
            DueStatus::Overdue => self.overdue,
            DueStatus::DueToday => self.due_today,
            DueStatus::DueTomorrow => self.due_tomorrow,
            DueStatus::DueSoon => self.due_soon,
            DueStatus::Assigned => self.assigned,
        }
    }

    /// Classified items (undated excluded)
    pub fn total(&self) -> usize {
        DueStatus::ALL.iter().map(|status| self.count(*status)).sum()
    }

    /// Classified items that are not yet late
    pub fn pending(&self) -> usize {
        self.total() - self.overdue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-15T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn make_item(id: &str, due: &str) -> DatedItem {
        DatedItem::new(id, due, format!("Homework {}", id))
    }

    fn ids(items: &[&DatedItem]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    // ========== classify tests ==========

    #[test]
    fn test_classify_reference_points() {
        let now = now();
        assert_eq!(classify(now, now), DueStatus::DueToday);
        assert_eq!(classify(now, now - Duration::milliseconds(1)), DueStatus::Overdue);
        assert_eq!(classify(now, now + Duration::hours(25)), DueStatus::DueTomorrow);
        assert_eq!(classify(now, now + Duration::hours(50)), DueStatus::DueSoon);
        assert_eq!(classify(now, now + Duration::hours(100)), DueStatus::Assigned);
    }

    #[test]
    fn test_classify_day_boundaries() {
        let now = now();
        let day = Duration::days(1);
        let ms = Duration::milliseconds(1);

        assert_eq!(classify(now, now + day - ms), DueStatus::DueToday);
        assert_eq!(classify(now, now + day), DueStatus::DueTomorrow);
        assert_eq!(classify(now, now + day * 2 - ms), DueStatus::DueTomorrow);
        assert_eq!(classify(now, now + day * 2), DueStatus::DueSoon);
        assert_eq!(classify(now, now + day * 4 - ms), DueStatus::DueSoon);
        assert_eq!(classify(now, now + day * 4), DueStatus::Assigned);
        assert_eq!(classify(now, now - day * 30), DueStatus::Overdue);
    }

    #[test]
    fn test_diff_days_floors() {
        let now = now();
        assert_eq!(diff_days(now, now), 0);
        assert_eq!(diff_days(now, now - Duration::milliseconds(1)), -1);
        assert_eq!(diff_days(now, now - Duration::hours(24)), -1);
        assert_eq!(diff_days(now, now - Duration::hours(25)), -2);
        assert_eq!(diff_days(now, now + Duration::hours(25)), 1);
        assert_eq!(diff_days(now, now + Duration::hours(100)), 4);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let now = now();
        let due = now + Duration::hours(30);
        assert_eq!(classify(now, due), classify(now, due));
    }

    // ========== sort_by_due tests ==========

    #[test]
    fn test_sort_by_due_ascending() {
        let items = vec![
            make_item("c", "2024-03-20T10:00:00Z"),
            make_item("a", "2024-03-10T10:00:00Z"),
            make_item("b", "2024-03-15T10:00:00Z"),
        ];
        assert_eq!(ids(&sort_by_due(&items, &Utc)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_by_due_ties_keep_input_order() {
        let items = vec![
            make_item("second", "2024-03-15T10:00:00Z"),
            make_item("first", "2024-03-14T10:00:00Z"),
            make_item("third", "2024-03-15T12:00:00+02:00"),
        ];
        // "third" is the same instant as "second"
        assert_eq!(ids(&sort_by_due(&items, &Utc)), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_sort_by_due_invalid_last() {
        let items = vec![
            make_item("bad1", "soon"),
            make_item("late", "2024-04-01T00:00:00Z"),
            make_item("bad2", ""),
            make_item("early", "2024-03-01T00:00:00Z"),
        ];
        assert_eq!(
            ids(&sort_by_due(&items, &Utc)),
            vec!["early", "late", "bad1", "bad2"]
        );
    }

    // ========== annotate tests ==========

    #[test]
    fn test_annotate_classifies_and_orders() {
        let items = vec![
            make_item("later", "2024-03-25T09:30:00Z"),
            make_item("missed", "2024-03-14T09:30:00Z"),
            make_item("broken", "xx"),
            make_item("tomorrow", "2024-03-16T10:00:00Z"),
        ];

        let entries = annotate(&items, now(), &Utc);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].item.id, "missed");
        assert_eq!(entries[0].status, DueStatus::Overdue);
        assert_eq!(entries[0].diff_days, -1);
        assert_eq!(entries[0].index, 1);

        assert_eq!(entries[1].item.id, "tomorrow");
        assert_eq!(entries[1].status, DueStatus::DueTomorrow);

        assert_eq!(entries[2].item.id, "later");
        assert_eq!(entries[2].status, DueStatus::Assigned);
        assert_eq!(entries[2].diff_days, 10);
        assert_eq!(entries[2].index, 0);
    }

    #[test]
    fn test_annotate_serializes_status() {
        let items = vec![make_item("x", "2024-03-15T12:00:00Z")];
        let entries = annotate(&items, now(), &Utc);
        let json = serde_json::to_value(&entries).unwrap();

        assert_eq!(json[0]["status"], "due_today");
        assert_eq!(json[0]["diff_days"], 0);
        assert_eq!(json[0]["item"]["id"], "x");
        assert!(json[0].get("index").is_none());
    }

    // ========== StatusSummary tests ==========

    #[test]
    fn test_summary_counts() {
        let items = vec![
            make_item("1", "2024-03-10T00:00:00Z"),
            make_item("2", "2024-03-15T18:00:00Z"),
            make_item("3", "2024-03-16T12:00:00Z"),
            make_item("4", "2024-03-17T12:00:00Z"),
            make_item("5", "2024-04-30T00:00:00Z"),
            make_item("6", "2024-05-30T00:00:00Z"),
            make_item("7", "not-a-date"),
        ];

        let summary = StatusSummary::from_items(&items, now(), &Utc);
        assert_eq!(
            summary,
            StatusSummary {
                overdue: 1,
                due_today: 1,
                due_tomorrow: 1,
                due_soon: 1,
                assigned: 2,
                undated: 1,
            }
        );
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.pending(), 5);
        assert_eq!(summary.count(DueStatus::Assigned), 2);
    }

    #[test]
    fn test_summary_empty() {
        let summary = StatusSummary::from_items(&[], now(), &Utc);
        assert_eq!(summary, StatusSummary::default());
        assert_eq!(summary.total(), 0);
        assert_eq!(summary.pending(), 0);
    }
}
