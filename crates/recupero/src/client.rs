//! Thin REST client for the school API.
//!
//! Every request carries the bearer token; collection endpoints take a
//! `from`/`to` window and may answer with a bare array or an envelope
//! object such as `{"success": true, "data": [...]}`.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::config::Credentials;

const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Object keys the API uses to wrap a collection.
///
/// Same list, same search order as the `agenda` data loader.
const ENVELOPE_KEYS: &[&str] = &["data", "homework", "events", "items", "results"];

/// A collection endpoint and the data file it is saved to
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    pub path: &'static str,
    pub file_name: &'static str,
}

pub const HOMEWORK: Collection = Collection {
    path: "homework",
    file_name: "homework.json",
};

pub const EVENTS: Collection = Collection {
    path: "calendar/events",
    file_name: "events.json",
};

/// Date range for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// 7 days before `today` to 30 days after.
    pub fn default_range(today: NaiveDate) -> Self {
        Self {
            from: today - Duration::days(7),
            to: today + Duration::days(30),
        }
    }

    /// Fill whichever bound is missing from the default range.
    pub fn resolve(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Result<Self> {
        let default = Self::default_range(today);
        let range = Self::new(from.unwrap_or(default.from), to.unwrap_or(default.to));
        if range.from > range.to {
            return Err(anyhow!(
                "Invalid date range: {} is after {}",
                range.from,
                range.to
            ));
        }
        Ok(range)
    }

    fn query(&self) -> [(&'static str, String); 2] {
        [
            ("from", self.from.format("%Y-%m-%d").to_string()),
            ("to", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("recupero/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, credentials })
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        endpoint_url(&self.credentials.base_url, path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint_url(path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.credentials.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} returned status {}: {}",
                url,
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }

    /// Check the token against the profile endpoint
    pub async fn verify(&self) -> Result<Value> {
        self.get_json("auth/me", &[]).await
    }

    pub async fn fetch_collection(&self, collection: Collection, range: DateRange) -> Result<Vec<Value>> {
        let value = self.get_json(collection.path, &range.query()).await?;
        let records = unwrap_envelope(value).with_context(|| {
            format!(
                "{} did not return a list of records",
                self.endpoint_url(collection.path)
            )
        })?;
        info!(endpoint = collection.path, count = records.len(), "Fetched records");
        Ok(records)
    }
}

/// Join the base URL and an endpoint path with exactly one slash
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
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

/// Best-effort display name from an `auth/me` response
pub fn profile_name(profile: &Value) -> Option<&str> {
    let user = profile
        .get("data")
        .or_else(|| profile.get("user"))
        .unwrap_or(profile);
    ["name", "fullName", "username", "email"]
        .iter()
        .find_map(|key| user.get(*key).and_then(Value::as_str))
}

/// Write records as a pretty-printed JSON array
pub fn save_json(records: &[Value], path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(records)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    if records.is_empty() {
        warn!(path = %path.display(), "Saved an empty collection");
    } else {
        info!(path = %path.display(), count = records.len(), "Saved");
    }
    Ok(())
}
