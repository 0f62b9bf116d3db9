use chrono::{Datelike, NaiveDate};

use crate::grid::CalendarPage;
use crate::types::CalendarCell;

const TEXT_CELL_WIDTH: usize = 7;

/// English ordinal suffix for a day of month ("st", "nd", "rd", "th")
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn ordinal(day: u32) -> String {
    format!("{}{}", day, ordinal_suffix(day))
}

/// "Friday, March 15th"
pub fn friendly_date(date: NaiveDate) -> String {
    format!("{} {}", date.format("%A, %B"), ordinal(date.day()))
}

/// Human wording for a calendar-day difference from today
pub fn relative_due_label(diff_days: i64) -> String {
    match diff_days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("in {} days", d),
    }
}

/// Day number plus a marker: `*` today, `~` outside the period,
/// followed by `+N` when items are due
fn text_cell(cell: &CalendarCell) -> String {
    let mark = if cell.is_today {
        '*'
    } else if !cell.is_current_period {
        '~'
    } else {
        ' '
    };
    let count = if cell.items.is_empty() {
        String::new()
    } else {
        format!("+{}", cell.items.len())
    };
    format!("{:>2}{}{}", cell.date.day(), mark, count)
}

/// Plain-text rendering of a grid for terminal output
pub fn text_grid(page: &CalendarPage) -> String {
    let mut lines = vec![page.title.clone()];

    let header: String = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
        .iter()
        .map(|name| format!("{:<width$}", name, width = TEXT_CELL_WIDTH))
        .collect();
    lines.push(header.trim_end().to_string());

    for week in page.weeks() {
        let row: String = week
            .iter()
            .map(|cell| format!("{:<width$}", text_cell(cell), width = TEXT_CELL_WIDTH))
            .collect();
        lines.push(row.trim_end().to_string());
    }

    lines.join("\n")
}
