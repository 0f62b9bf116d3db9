//! Viewer settings: where the data lives and which time zone days are cut in.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::bucket;
use crate::grid::{self, CalendarView};
use crate::status::{self, StatusEntry, StatusSummary};
use crate::types::{CalendarCell, DatedItem};

pub const ENV_TZ: &str = "AGENDA_TZ";
pub const ENV_DATA_DIR: &str = "AGENDA_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("unknown time zone '{0}' (use 'local' or an IANA name like 'Europe/Rome')")]
    Unknown(String),
}

/// Time zone the viewer's calendar days are computed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewerZone {
    /// Zone of the machine running the viewer
    #[default]
    Local,
    Named(Tz),
}

impl FromStr for ViewerZone {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("local") {
            return Ok(ViewerZone::Local);
        }
        name.parse::<Tz>()
            .map(ViewerZone::Named)
            .map_err(|_| ZoneError::Unknown(name.to_string()))
    }
}

impl fmt::Display for ViewerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerZone::Local => f.write_str("local"),
            ViewerZone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl ViewerZone {
    pub fn sort_by_due<'a>(&self, items: &'a [DatedItem]) -> Vec<&'a DatedItem> {
        match self {
            ViewerZone::Local => status::sort_by_due(items, &Local),
            ViewerZone::Named(tz) => status::sort_by_due(items, tz),
        }
    }

    pub fn local_day(&self, instant: &DateTime<Utc>) -> NaiveDate {
        match self {
            ViewerZone::Local => bucket::local_day(instant, &Local),
            ViewerZone::Named(tz) => bucket::local_day(instant, tz),
        }
    }

    /// Calendar day that contains `now` for this viewer
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_day(&now)
    }

    pub fn bucket_by_date<'a>(&self, items: &'a [DatedItem], target: NaiveDate) -> Vec<&'a DatedItem> {
        match self {
            ViewerZone::Local => bucket::bucket_by_date(items, target, &Local),
            ViewerZone::Named(tz) => bucket::bucket_by_date(items, target, tz),
        }
    }

    pub fn build_cells(
        &self,
        view: CalendarView,
        reference: NaiveDate,
        today: NaiveDate,
        items: &[DatedItem],
    ) -> Vec<CalendarCell> {
        match self {
            ViewerZone::Local => grid::build_cells(view, reference, today, items, &Local),
            ViewerZone::Named(tz) => grid::build_cells(view, reference, today, items, tz),
        }
    }

    pub fn annotate<'a>(&self, items: &'a [DatedItem], now: DateTime<Utc>) -> Vec<StatusEntry<'a>> {
        match self {
            ViewerZone::Local => status::annotate(items, now, &Local),
            ViewerZone::Named(tz) => status::annotate(items, now, tz),
        }
    }

    pub fn summary(&self, items: &[DatedItem], now: DateTime<Utc>) -> StatusSummary {
        match self {
            ViewerZone::Local => StatusSummary::from_items(items, now, &Local),
            ViewerZone::Named(tz) => StatusSummary::from_items(items, now, tz),
        }
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub zone: ViewerZone,
}

impl Settings {
    /// Resolve settings from CLI flags, falling back to `AGENDA_DATA_DIR`
    /// and `AGENDA_TZ` (a `.env` file is read if present).
    pub fn resolve(
        data_dir: Option<PathBuf>,
        output_dir: PathBuf,
        tz: Option<String>,
    ) -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::resolve_with(data_dir, output_dir, tz, |key| std::env::var(key).ok())
    }

    fn resolve_with<F>(
        data_dir: Option<PathBuf>,
        output_dir: PathBuf,
        tz: Option<String>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = data_dir
            .or_else(|| env(ENV_DATA_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let zone = match tz.or_else(|| env(ENV_TZ)) {
            Some(name) => name.parse::<ViewerZone>()?,
            None => ViewerZone::Local,
        };

        Ok(Self {
            data_dir,
            output_dir,
            zone,
        })
    }
}
