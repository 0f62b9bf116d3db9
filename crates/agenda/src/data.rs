use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ViewerZone;
use crate::status::StatusSummary;
use crate::types::{DatedItem, DueStatus, EventRecord, HomeworkRecord};

pub const HOMEWORK_FILE: &str = "homework.json";
pub const EVENTS_FILE: &str = "events.json";

/// Object keys the API uses to wrap a collection.
///
/// Same list, same search order as the `recupero` client.
const ENVELOPE_KEYS: &[&str] = &["data", "homework", "events", "items", "results"];

/// Everything the calendar views read, as last fetched from the API
#[derive(Debug, Clone, Default)]
pub struct Agenda {
    pub homework: Vec<HomeworkRecord>,
    pub events: Vec<EventRecord>,
}

impl Agenda {
    pub fn homework_items(&self) -> Vec<DatedItem> {
        self.homework.iter().map(DatedItem::from).collect()
    }

    pub fn event_items(&self) -> Vec<DatedItem> {
        self.events.iter().map(DatedItem::from).collect()
    }

    /// Homework followed by events
    pub fn items(&self) -> Vec<DatedItem> {
        let mut items = self.homework_items();
        items.extend(self.event_items());
        items
    }

    pub fn len(&self) -> usize {
        self.homework.len() + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A homework record with its classification, as shown in lists
#[derive(Debug, Clone, Serialize)]
pub struct HomeworkStatus {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub due: DateTime<Utc>,
    pub due_day: NaiveDate,
    pub status: DueStatus,
    /// Whole 24-hour periods until due, as used by the classifier
    pub diff_days: i64,
    /// Calendar days from the viewer's today to `due_day`
    pub due_in_days: i64,
}

impl Agenda {
    /// Dated homework classified against `now`, earliest due first
    pub fn homework_status(&self, now: DateTime<Utc>, zone: ViewerZone) -> Vec<HomeworkStatus> {
        let items = self.homework_items();
        let today = zone.today(now);
        zone.annotate(&items, now)
            .into_iter()
            .filter_map(|entry| {
                let record = self.homework.get(entry.index)?;
                let due_day = zone.local_day(&entry.due);
                Some(HomeworkStatus {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    subject: record.subject_name().to_string(),
                    description: record.description.clone(),
                    color: record.color.clone(),
                    due: entry.due,
                    due_day,
                    status: entry.status,
                    diff_days: entry.diff_days,
                    due_in_days: (due_day - today).num_days(),
                })
            })
            .collect()
    }

    pub fn summary(&self, now: DateTime<Utc>, zone: ViewerZone) -> StatusSummary {
        zone.summary(&self.homework_items(), now)
    }
}

/// Load `homework.json` and `events.json` from the data directory.
///
/// A missing file is an empty collection; both missing is an error.
pub fn load_agenda(data_dir: &Path) -> Result<Agenda> {
    let homework_path = data_dir.join(HOMEWORK_FILE);
    let events_path = data_dir.join(EVENTS_FILE);

    if !homework_path.exists() && !events_path.exists() {
        anyhow::bail!(
            "No data files found in {} (expected {} or {})",
            data_dir.display(),
            HOMEWORK_FILE,
            EVENTS_FILE
        );
    }

    let homework: Vec<HomeworkRecord> = load_records(&homework_path)?;
    let events: Vec<EventRecord> = load_records(&events_path)?;

    info!(
        homework = homework.len(),
        events = events.len(),
        "Agenda loaded"
    );

    Ok(Agenda { homework, events })
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "Data file missing, using empty collection");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let raw = unwrap_envelope(value)
        .with_context(|| format!("{} does not contain a list of records", path.display()))?;

    Ok(parse_records(raw, path))
}

/// Pull the record list out of a bare array or an envelope object
pub fn unwrap_envelope(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| map.remove(*key).and_then(unwrap_envelope)),
        _ => None,
    }
}

/// Deserialize each record, skipping the ones that don't fit the schema
fn parse_records<T: DeserializeOwned>(raw: Vec<Value>, path: &Path) -> Vec<T> {
    let total = raw.len();
    let records: Vec<T> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file = %path.display(), index = index, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect();

    debug!(
        file = %path.display(),
        kept = records.len(),
        skipped = total - records.len(),
        "Records parsed"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    // ========== unwrap_envelope tests ==========

    #[test]
    fn test_envelope_keys_contract() {
        assert_eq!(ENVELOPE_KEYS, &["data", "homework", "events", "items", "results"]);
    }

    #[test]
    fn test_unwrap_bare_array() {
        let items = unwrap_envelope(json!([{"_id": "1"}, {"_id": "2"}])).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_unwrap_data_envelope() {
        let items = unwrap_envelope(json!({"success": true, "data": [{"_id": "1"}]})).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unwrap_nested_envelope() {
        let value = json!({"data": {"homework": [{"_id": "1"}, {"_id": "2"}], "count": 2}});
        assert_eq!(unwrap_envelope(value).unwrap().len(), 2);
    }

    #[test]
    fn test_unwrap_rejects_other_shapes() {
        assert!(unwrap_envelope(json!("hello")).is_none());
        assert!(unwrap_envelope(json!({"message": "Unauthorized"})).is_none());
        assert!(unwrap_envelope(json!(null)).is_none());
    }

    // ========== load_agenda tests ==========

    #[test]
    fn test_load_agenda_both_files() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            HOMEWORK_FILE,
            r#"[{"_id": "hw1", "title": "Essay", "dueDate": "2024-03-15T10:00:00Z"}]"#,
        );
        write(
            &temp_dir,
            EVENTS_FILE,
            r#"{"data": [{"_id": "ev1", "title": "Trip", "date": "2024-03-20", "eventType": "trip"}]}"#,
        );

        let agenda = load_agenda(temp_dir.path()).unwrap();
        assert_eq!(agenda.homework.len(), 1);
        assert_eq!(agenda.events.len(), 1);
        assert_eq!(agenda.events[0].event_type, "trip");
        assert_eq!(agenda.len(), 2);
    }

    #[test]
    fn test_load_agenda_missing_one_file() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, EVENTS_FILE, r#"[{"_id": "ev1", "date": "2024-03-20"}]"#);

        let agenda = load_agenda(temp_dir.path()).unwrap();
        assert!(agenda.homework.is_empty());
        assert_eq!(agenda.events.len(), 1);
    }

    #[test]
    fn test_load_agenda_no_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_agenda(temp_dir.path());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No data files found"));
    }

    #[test]
    fn test_load_agenda_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, HOMEWORK_FILE, "not valid json");

        let err = load_agenda(temp_dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(HOMEWORK_FILE));
    }

    #[test]
    fn test_load_agenda_not_a_collection() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, HOMEWORK_FILE, r#"{"message": "Unauthorized"}"#);

        let err = load_agenda(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("does not contain a list of records"));
    }

    #[test]
    fn test_load_agenda_skips_malformed_records() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            HOMEWORK_FILE,
            r#"[
                {"_id": "ok1", "dueDate": "2024-03-15"},
                {"title": "no id"},
                42,
                {"_id": "ok2", "dueDate": "garbage"}
            ]"#,
        );

        let agenda = load_agenda(temp_dir.path()).unwrap();
        let ids: Vec<_> = agenda.homework.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["ok1", "ok2"]);
    }

    // ========== Agenda tests ==========

    #[test]
    fn test_agenda_items_homework_then_events() {
        let agenda = Agenda {
            homework: vec![serde_json::from_value(json!({"_id": "hw", "dueDate": "2024-03-15"})).unwrap()],
            events: vec![serde_json::from_value(json!({"_id": "ev", "date": "2024-03-14"})).unwrap()],
        };

        let items = agenda.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "hw");
        assert_eq!(items[1].id, "ev");
        assert_eq!(items[1].due_date, "2024-03-14");
    }

    #[test]
    fn test_homework_status_sorted_and_classified() {
        let agenda = Agenda {
            homework: vec![
                serde_json::from_value(json!({
                    "_id": "late", "title": "Project", "dueDate": "2024-03-30T12:00:00Z",
                    "subjectId": {"name": "Science"}
                }))
                .unwrap(),
                serde_json::from_value(json!({"_id": "undated", "title": "Mystery"})).unwrap(),
                serde_json::from_value(json!({
                    "_id": "soon", "title": "Worksheet", "dueDate": "2024-03-16T08:00:00Z"
                }))
                .unwrap(),
            ],
            events: vec![],
        };
        let now = DateTime::parse_from_rfc3339("2024-03-15T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let zone = ViewerZone::Named(chrono_tz::UTC);

        let list = agenda.homework_status(now, zone);
        assert_eq!(list.len(), 2);

        assert_eq!(list[0].id, "soon");
        assert_eq!(list[0].status, DueStatus::DueToday);
        assert_eq!(list[0].subject, "Subject");
        assert_eq!(list[0].due_day, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());

        assert_eq!(list[1].id, "late");
        assert_eq!(list[1].status, DueStatus::Assigned);
        assert_eq!(list[1].subject, "Science");
        assert_eq!(list[1].diff_days, 15);

        let summary = agenda.summary(now, zone);
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.undated, 1);
    }

    #[test]
    fn test_due_in_days_counts_calendar_days() {
        let agenda = Agenda {
            homework: vec![
                serde_json::from_value(json!({"_id": "earlier", "dueDate": "2024-03-15T08:00:00Z"})).unwrap(),
                serde_json::from_value(json!({"_id": "morning", "dueDate": "2024-03-16T08:00:00Z"})).unwrap(),
            ],
            events: vec![],
        };
        let now = DateTime::parse_from_rfc3339("2024-03-15T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let list = agenda.homework_status(now, ViewerZone::Named(chrono_tz::UTC));

        // Status follows elapsed time, the day count follows the calendar
        assert_eq!(list[0].id, "earlier");
        assert_eq!(list[0].status, DueStatus::Overdue);
        assert_eq!(list[0].diff_days, -1);
        assert_eq!(list[0].due_in_days, 0);

        assert_eq!(list[1].id, "morning");
        assert_eq!(list[1].status, DueStatus::DueToday);
        assert_eq!(list[1].diff_days, 0);
        assert_eq!(list[1].due_in_days, 1);
    }

    #[test]
    fn test_agenda_default_is_empty() {
        assert!(Agenda::default().is_empty());
    }
}
