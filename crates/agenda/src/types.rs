use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject name shown when the backend sends no populated subject
pub const DEFAULT_SUBJECT: &str = "Subject";

/// Event type used when the backend omits `eventType`
pub const DEFAULT_EVENT_TYPE: &str = "event";

/// Which backend collection an item came from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Homework,
    Event,
}

/// A homework assignment or calendar event, reduced to what the calendar needs
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DatedItem {
    pub id: String,

    /// Raw ISO-8601 timestamp as sent by the backend
    #[serde(rename = "dueDate")]
    pub due_date: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub kind: ItemKind,
}

impl DatedItem {
    pub fn new(id: impl Into<String>, due_date: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            due_date: due_date.into(),
            title: title.into(),
            color: None,
            kind: ItemKind::Homework,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

}

/// The `subjectId` field is either populated with the subject document or
/// left as a bare id, depending on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum SubjectField {
    Populated {
        #[serde(default)]
        name: Option<String>,
    },
    Id(String),
}

/// Homework as returned by the school API
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Missing due dates stay empty and are dropped at bucketing time
    #[serde(default)]
    pub due_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "subjectId", skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl HomeworkRecord {
    pub fn subject_name(&self) -> &str {
        match &self.subject {
            Some(SubjectField::Populated { name: Some(name) }) if !name.trim().is_empty() => name,
            _ => DEFAULT_SUBJECT,
        }
    }
}

impl From<&HomeworkRecord> for DatedItem {
    fn from(record: &HomeworkRecord) -> Self {
        DatedItem {
            id: record.id.clone(),
            due_date: record.due_date.clone(),
            title: record.title.clone(),
            color: record.color.clone(),
            kind: ItemKind::Homework,
        }
    }
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

/// Calendar event (holiday, exam, meeting) as returned by the school API
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub date: String,

    /// Free-form time of day, display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default = "default_event_type")]
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&EventRecord> for DatedItem {
    fn from(record: &EventRecord) -> Self {
        DatedItem {
            id: record.id.clone(),
            due_date: record.date.clone(),
            title: record.title.clone(),
            color: record.color.clone(),
            kind: ItemKind::Event,
        }
    }
}

/// One day of a rendered calendar grid
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub items: Vec<DatedItem>,
    pub is_current_period: bool,
    pub is_today: bool,
}

/// Urgency bucket for a due date relative to now
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Overdue,
    DueToday,
    DueTomorrow,
    DueSoon,
    Assigned,
}

impl DueStatus {
    pub const ALL: [DueStatus; 5] = [
        DueStatus::Overdue,
        DueStatus::DueToday,
        DueStatus::DueTomorrow,
        DueStatus::DueSoon,
        DueStatus::Assigned,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DueStatus::Overdue => "Overdue",
            DueStatus::DueToday => "Due today",
            DueStatus::DueTomorrow => "Due tomorrow",
            DueStatus::DueSoon => "Due soon",
            DueStatus::Assigned => "Assigned",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DueStatus::Overdue => "overdue",
            DueStatus::DueToday => "due_today",
            DueStatus::DueTomorrow => "due_tomorrow",
            DueStatus::DueSoon => "due_soon",
            DueStatus::Assigned => "assigned",
        }
    }

    /// CSS class used by the rendered views
    pub fn css_class(self) -> &'static str {
        match self {
            DueStatus::Overdue => "status-overdue",
            DueStatus::DueToday => "status-today",
            DueStatus::DueTomorrow => "status-tomorrow",
            DueStatus::DueSoon => "status-soon",
            DueStatus::Assigned => "status-assigned",
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
