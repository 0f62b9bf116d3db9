//! Grouping of dated items onto calendar days.
//!
//! Days are compared in the viewer's time zone, never by UTC date, so an
//! item due late in the evening stays on the day the viewer sees it.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::types::DatedItem;

/// Offset-less timestamp layouts, read as wall time in the viewer's zone
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a backend timestamp into an instant.
///
/// Accepts RFC 3339 (with `Z` or an explicit offset), a bare `YYYY-MM-DD`
/// (midnight UTC, the same reading a browser gives it) and an offset-less
/// date-time (wall time in `zone`). Returns `None` for anything else.
///
/// A repeated wall time takes its earlier instant. A skipped wall time is
/// read with the offset in force before the gap, so 02:30 on a spring-forward
/// night lands at 03:30 the way a browser places it.
pub fn parse_instant<Tz: TimeZone>(raw: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| resolve_wall_time(naive, zone))
}

fn resolve_wall_time<Tz: TimeZone>(naive: NaiveDateTime, zone: &Tz) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let before = naive.checked_sub_signed(Duration::days(1))?;
            let offset = zone.offset_from_utc_datetime(&before).fix();
            naive
                .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
                .map(|utc| utc.and_utc())
        }
    }
}

/// Calendar day of `instant` as seen from `zone`
pub fn local_day<Tz: TimeZone>(instant: &DateTime<Utc>, zone: &Tz) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

/// Local calendar day of an item's due date, if it parses
pub fn item_day<Tz: TimeZone>(item: &DatedItem, zone: &Tz) -> Option<NaiveDate> {
    parse_instant(&item.due_date, zone).map(|instant| local_day(&instant, zone))
}

/// Items due on `target` in the viewer's zone, in input order.
/// Items with unparseable dates are skipped.
pub fn bucket_by_date<'a, Tz: TimeZone>(
    items: &'a [DatedItem],
    target: NaiveDate,
    zone: &Tz,
) -> Vec<&'a DatedItem> {
    items
        .iter()
        .filter(|item| item_day(item, zone) == Some(target))
        .collect()
}

/// Day → items map built in a single pass.
///
/// `items_on` returns the same sequence `bucket_by_date` would for that day.
#[derive(Debug, Default)]
pub struct DayIndex<'a> {
    days: BTreeMap<NaiveDate, Vec<&'a DatedItem>>,
    skipped: usize,
}

impl<'a> DayIndex<'a> {
    pub fn build<Tz: TimeZone>(items: &'a [DatedItem], zone: &Tz) -> Self {
        let mut index = DayIndex::default();
        for item in items {
            match item_day(item, zone) {
                Some(day) => index.days.entry(day).or_default().push(item),
                None => index.skipped += 1,
            }
        }
        index
    }

    pub fn items_on(&self, day: NaiveDate) -> &[&'a DatedItem] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of items dropped because their date did not parse
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
