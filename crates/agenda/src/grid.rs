//! Week and month calendar grids.
//!
//! Grids always start on a Sunday. A month grid is six full weeks, so it
//! carries trailing days of the previous month and leading days of the
//! next one; those cells are flagged as outside the current period.

use chrono::{Datelike, Duration, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::bucket::DayIndex;
use crate::types::{CalendarCell, DatedItem};

pub const WEEK_CELLS: usize = 7;
pub const MONTH_CELLS: usize = 42;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("unknown calendar view '{0}' (expected 'week' or 'month')")]
    Unknown(String),
}

/// Which grid a calendar screen shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    Week,
    #[default]
    Month,
}

impl CalendarView {
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarView::Week => "week",
            CalendarView::Month => "month",
        }
    }
}

impl fmt::Display for CalendarView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarView {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(CalendarView::Week),
            "month" => Ok(CalendarView::Month),
            _ => Err(ViewError::Unknown(s.to_string())),
        }
    }
}

/// Saturates at `NaiveDate::MIN` / `NaiveDate::MAX`. Grids touching either
/// end are therefore no longer strictly consecutive there.
fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Sunday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_sunday()))
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// The Sunday-start week containing `reference`
pub fn generate_week(reference: NaiveDate) -> [NaiveDate; WEEK_CELLS] {
    let start = start_of_week(reference);
    std::array::from_fn(|offset| add_days(start, offset as i64))
}

/// Six Sunday-start weeks covering the month of `reference`
pub fn generate_month(reference: NaiveDate) -> [NaiveDate; MONTH_CELLS] {
    let start = start_of_week(first_day_of_month(reference));
    std::array::from_fn(|offset| add_days(start, offset as i64))
}

pub fn visible_dates(view: CalendarView, reference: NaiveDate) -> Vec<NaiveDate> {
    match view {
        CalendarView::Week => generate_week(reference).to_vec(),
        CalendarView::Month => generate_month(reference).to_vec(),
    }
}

/// Move the reference date by `step` weeks or months.
///
/// Month steps keep the day of month when the target month has it and
/// clamp to its last day otherwise (Jan 31 + 1 month is Feb 28/29).
pub fn navigate(view: CalendarView, reference: NaiveDate, step: i32) -> NaiveDate {
    match view {
        CalendarView::Week => add_days(reference, i64::from(step) * 7),
        CalendarView::Month => {
            let months = Months::new(step.unsigned_abs());
            let shifted = if step >= 0 {
                reference.checked_add_months(months)
            } else {
                reference.checked_sub_months(months)
            };
            shifted.unwrap_or(reference)
        }
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Build the cells of a grid with the items due on each day
pub fn build_cells<Tz: TimeZone>(
    view: CalendarView,
    reference: NaiveDate,
    today: NaiveDate,
    items: &[DatedItem],
    zone: &Tz,
) -> Vec<CalendarCell> {
    let index = DayIndex::build(items, zone);
    if index.skipped() > 0 {
        debug!(skipped = index.skipped(), "Ignoring items with unparseable dates");
    }

    visible_dates(view, reference)
        .into_iter()
        .map(|date| CalendarCell {
            date,
            items: index.items_on(date).iter().map(|item| (*item).clone()).collect(),
            is_current_period: match view {
                CalendarView::Week => true,
                CalendarView::Month => same_month(date, reference),
            },
            is_today: date == today,
        })
        .collect()
}

/// A grid plus the navigation around it, as served to the views
#[derive(Debug, Clone, Serialize)]
pub struct CalendarPage {
    pub view: CalendarView,
    pub reference: NaiveDate,
    pub title: String,
    pub previous: NaiveDate,
    pub next: NaiveDate,
    pub cells: Vec<CalendarCell>,
}

impl CalendarPage {
    pub fn new(view: CalendarView, reference: NaiveDate, cells: Vec<CalendarCell>) -> Self {
        Self {
            view,
            reference,
            title: period_title(view, reference),
            previous: navigate(view, reference, -1),
            next: navigate(view, reference, 1),
            cells,
        }
    }

    /// Cells split into rows of seven
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(WEEK_CELLS)
    }
}

/// Heading for a grid: "March 2024" or "Mar 10 - Mar 16, 2024"
pub fn period_title(view: CalendarView, reference: NaiveDate) -> String {
    match view {
        CalendarView::Month => reference.format("%B %Y").to_string(),
        CalendarView::Week => {
            let days = generate_week(reference);
            let (start, end) = (days[0], days[WEEK_CELLS - 1]);
            if start.year() == end.year() {
                format!(
                    "{} - {}, {}",
                    start.format("%b %-d"),
                    end.format("%b %-d"),
                    end.year()
                )
            } else {
                format!("{} - {}", start.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
            }
        }
    }
}
