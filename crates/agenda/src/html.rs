use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::data::HomeworkStatus;
use crate::format::{friendly_date, relative_due_label};
use crate::grid::{CalendarPage, CalendarView};
use crate::status::StatusSummary;
use crate::types::{CalendarCell, DatedItem, DueStatus, ItemKind};

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Write the rendered page to disk
pub fn generate_html(
    page: &CalendarPage,
    homework: &[HomeworkStatus],
    summary: &StatusSummary,
    today: NaiveDate,
    path: &Path,
) -> Result<()> {
    let html = render_page(page, homework, summary, today);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn page_link(view: CalendarView, date: NaiveDate) -> String {
    format!("?view={}&date={}", view, date.format("%Y-%m-%d"))
}

pub fn render_page(
    page: &CalendarPage,
    homework: &[HomeworkStatus],
    summary: &StatusSummary,
    today: NaiveDate,
) -> Markup {
    let statuses: HashMap<&str, DueStatus> = homework
        .iter()
        .map(|hw| (hw.id.as_str(), hw.status))
        .collect();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Agenda - " (page.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Agenda" }
                    div.stats {
                        span #"total-count" { (summary.total()) }
                        " homework / "
                        span #"overdue-count" { (summary.overdue) }
                        " overdue / "
                        span #"pending-count" { (summary.pending()) }
                        " pending"
                    }
                    (render_nav(page, today))
                    div.calendar-grid.(page.view.as_str()) {
                        @for name in WEEKDAY_NAMES {
                            div.weekday { (name) }
                        }
                        @for week in page.weeks() {
                            @for cell in week {
                                (render_cell(cell, &statuses))
                            }
                        }
                    }
                    h2.section-title { "Homework" }
                    div.homework-list #"homework-list" {
                        @if homework.is_empty() {
                            div.empty-state {
                                p { "No homework with a due date." }
                            }
                        } @else {
                            @for hw in homework {
                                (render_homework(hw))
                            }
                        }
                    }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn render_nav(page: &CalendarPage, today: NaiveDate) -> Markup {
    html! {
        nav.period-nav {
            a.nav-link href=(page_link(page.view, page.previous)) { "< Previous" }
            h2.period-title { (page.title) }
            a.nav-link href=(page_link(page.view, today)) { "Today" }
            a.nav-link href=(page_link(page.view, page.next)) { "Next >" }
            span.view-toggle {
                @for view in [CalendarView::Week, CalendarView::Month] {
                    a.nav-link.active[view == page.view] href=(page_link(view, page.reference)) {
                        (view.as_str())
                    }
                }
            }
        }
    }
}

fn render_cell(cell: &CalendarCell, statuses: &HashMap<&str, DueStatus>) -> Markup {
    html! {
        div.cell.outside[!cell.is_current_period].today[cell.is_today] data-date=(cell.date.format("%Y-%m-%d").to_string()) {
            div.day-number { (cell.date.day()) }
            @for item in &cell.items {
                (render_chip(item, chip_status(item, statuses)))
            }
        }
    }
}

/// Status for homework chips; events never take a status color
fn chip_status(item: &DatedItem, statuses: &HashMap<&str, DueStatus>) -> Option<DueStatus> {
    match item.kind {
        ItemKind::Homework => statuses.get(item.id.as_str()).copied(),
        ItemKind::Event => None,
    }
}

fn render_chip(item: &DatedItem, status: Option<DueStatus>) -> Markup {
    let class = status.map(DueStatus::css_class).unwrap_or("event");
    html! {
        @if let Some(color) = &item.color {
            div.chip.(class) style={"border-left-color: " (color)} title=(item.title) { (item.title) }
        } @else {
            div.chip.(class) title=(item.title) { (item.title) }
        }
    }
}

fn render_homework(hw: &HomeworkStatus) -> Markup {
    html! {
        div.homework-item.(hw.status.css_class()) data-entry-id=(hw.id) {
            input.homework-checkbox type="checkbox" id={"entry-" (hw.id)} data-entry-id=(hw.id);
            div.homework-content {
                div.homework-subject {
                    (hw.subject)
                    span.homework-status { (hw.status.label()) }
                }
                div.homework-task { (hw.title) }
                @if let Some(description) = &hw.description {
                    div.homework-description { (description) }
                }
                div.homework-due {
                    (friendly_date(hw.due_day)) " (" (relative_due_label(hw.due_in_days)) ")"
                }
            }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
    background: #0a0a0a;
    color: #fff;
    min-height: 100vh;
    line-height: 1.4;
}

.container {
    max-width: 1100px;
    margin: 0 auto;
    padding: 40px 24px 60px;
}

h1 {
    font-weight: 900;
    font-size: 3.5em;
    text-transform: uppercase;
    text-shadow: 4px 4px 0 #ff0096, -2px -2px 0 #00ffff;
}

.stats {
    color: #888;
    font-size: 0.85em;
    font-weight: 700;
    margin: 8px 0 32px;
    text-transform: uppercase;
    letter-spacing: 0.1em;
}

.period-nav {
    display: flex;
    align-items: center;
    gap: 16px;
    margin-bottom: 16px;
}

.period-title {
    flex: 1;
    text-align: center;
    text-transform: uppercase;
    letter-spacing: 0.1em;
}

.nav-link {
    color: #00ffff;
    text-decoration: none;
    font-weight: 700;
    text-transform: uppercase;
    font-size: 0.8em;
    padding: 4px 8px;
    border: 1px solid rgba(0,255,255,0.3);
}

.nav-link.active {
    background: #00ffff;
    color: #000;
}

.calendar-grid {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
    gap: 4px;
    margin-bottom: 48px;
}

.weekday {
    color: #888;
    font-size: 0.75em;
    font-weight: 700;
    text-transform: uppercase;
    text-align: center;
    padding: 4px 0;
}

.cell {
    min-height: 96px;
    padding: 6px;
    background: rgba(255,255,255,0.03);
    border: 1px solid rgba(255,255,255,0.1);
    overflow: hidden;
}

.calendar-grid.week .cell {
    min-height: 220px;
}

.cell.outside {
    opacity: 0.35;
}

.cell.today {
    border-color: #ff0096;
    box-shadow: 0 0 8px rgba(255,0,150,0.5);
}

.day-number {
    font-weight: 900;
    font-size: 0.9em;
    margin-bottom: 4px;
}

.chip {
    font-size: 0.7em;
    padding: 2px 4px;
    margin-bottom: 2px;
    border-left: 3px solid #888;
    background: rgba(255,255,255,0.06);
    white-space: nowrap;
    overflow: hidden;
    text-overflow: ellipsis;
}

.status-overdue { border-left-color: #ff3b3b; }
.status-today { border-left-color: #ff9800; }
.status-tomorrow { border-left-color: #ffd600; }
.status-soon { border-left-color: #00ffff; }
.status-assigned { border-left-color: #4caf50; }
.event { border-left-color: #b388ff; }

.section-title {
    text-transform: uppercase;
    letter-spacing: 0.15em;
    margin-bottom: 20px;
}

.homework-list {
    display: grid;
    gap: 12px;
}

.homework-item {
    display: flex;
    align-items: flex-start;
    gap: 20px;
    padding: 16px 20px;
    background: rgba(255,255,255,0.03);
    border: 1px solid rgba(255,255,255,0.1);
    border-left-width: 4px;
}

.homework-item.completed {
    opacity: 0.3;
    filter: grayscale(1);
}

.homework-item.completed .homework-task {
    text-decoration: line-through;
}

.homework-checkbox {
    width: 24px;
    height: 24px;
    min-width: 24px;
    cursor: pointer;
    accent-color: #ff0096;
}

.homework-content {
    flex: 1;
}

.homework-subject {
    font-weight: 700;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    display: flex;
    gap: 12px;
}

.homework-status {
    font-size: 0.7em;
    padding: 2px 8px;
    background: #fff;
    color: #000;
}

.homework-task {
    color: #ccc;
    margin-top: 4px;
}

.homework-description,
.homework-due {
    color: #888;
    font-size: 0.85em;
    margin-top: 4px;
}

.empty-state {
    padding: 60px 20px;
    text-align: center;
    color: #666;
    font-size: 0.9em;
}

@media (max-width: 768px) {
    h1 {
        font-size: 2.5em;
    }

    .cell {
        min-height: 56px;
    }

    .chip {
        display: none;
    }
}
"#;

const JAVASCRIPT: &str = r#"
// Completion is kept per browser, keyed by homework id
function loadCheckboxStates() {
    const saved = localStorage.getItem('agenda-completed');
    if (!saved) return;
    const states = JSON.parse(saved);
    Object.keys(states).forEach(entryId => {
        const checkbox = document.getElementById(`entry-${entryId}`);
        const item = document.querySelector(`.homework-item[data-entry-id="${entryId}"]`);
        if (checkbox && states[entryId]) {
            checkbox.checked = true;
            if (item) item.classList.add('completed');
        }
    });
}

function saveCheckboxState(entryId, checked) {
    const states = JSON.parse(localStorage.getItem('agenda-completed') || '{}');
    if (checked) {
        states[entryId] = true;
    } else {
        delete states[entryId];
    }
    localStorage.setItem('agenda-completed', JSON.stringify(states));
}

document.querySelectorAll('.homework-checkbox').forEach(checkbox => {
    checkbox.addEventListener('change', function() {
        const entryId = this.getAttribute('data-entry-id');
        const item = document.querySelector(`.homework-item[data-entry-id="${entryId}"]`);
        item.classList.toggle('completed', this.checked);
        saveCheckboxState(entryId, this.checked);
    });
});

loadCheckboxStates();
"#;
