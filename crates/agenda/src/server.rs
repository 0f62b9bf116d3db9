use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::data::{self, Agenda, HomeworkStatus, EVENTS_FILE, HOMEWORK_FILE};
use crate::grid::{CalendarPage, CalendarView};
use crate::html;
use crate::status::StatusSummary;

/// Application state shared across requests
pub struct AppState {
    pub agenda: RwLock<Agenda>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(agenda: Agenda, settings: Settings) -> Self {
        Self {
            agenda: RwLock::new(agenda),
            settings,
        }
    }

    /// Reload the agenda from disk, keeping the old one on failure
    async fn reload(&self) -> anyhow::Result<usize> {
        let fresh = data::load_agenda(&self.settings.data_dir)?;
        let mut agenda = self.agenda.write().await;
        let old_count = agenda.len();
        *agenda = fresh;
        let new_count = agenda.len();
        if new_count != old_count {
            info!(
                count = new_count,
                delta = new_count as i64 - old_count as i64,
                "Agenda updated"
            );
        } else {
            debug!("Agenda reloaded, no change in size");
        }
        Ok(new_count)
    }
}

/// Start the web server with file watching
pub async fn serve(port: u16, settings: Settings) -> anyhow::Result<()> {
    if !settings.data_dir.exists() {
        std::fs::create_dir_all(&settings.data_dir)?;
        info!(path = %settings.data_dir.display(), "Created data directory");
    }

    let agenda = match data::load_agenda(&settings.data_dir) {
        Ok(agenda) => agenda,
        Err(e) => {
            warn!(error = %e, "Starting with an empty agenda");
            Agenda::default()
        }
    };

    if agenda.is_empty() {
        info!("No homework or events yet, waiting for data files");
    }

    let state = Arc::new(AppState::new(agenda, settings));

    // Held for the lifetime of the server; dropping it stops the watcher
    let _watcher = start_file_watcher(state.clone())?;

    let app = router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(
        url = %format!("http://{}", addr),
        data_dir = %state.settings.data_dir.display(),
        zone = %state.settings.zone,
        "Server running"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let data_dir = state.settings.data_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/api/calendar", get(calendar_handler))
        .route("/api/homework", get(homework_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/refresh", get(refresh_handler))
        .nest_service("/data", ServeDir::new(data_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_data_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n == HOMEWORK_FILE || n == EVENTS_FILE)
        .unwrap_or(false)
}

/// Watch the data directory and reload when one of the data files changes
fn start_file_watcher(state: Arc<AppState>) -> anyhow::Result<Debouncer<RecommendedWatcher>> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    let mut debouncer = new_debouncer(
        Duration::from_secs(2),
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events.iter().any(|e| is_data_file(&e.path)) {
                    let _ = tx.blocking_send(());
                }
            }
            Err(e) => warn!(error = %e, "File watcher error"),
        },
    )?;

    debouncer
        .watcher()
        .watch(&state.settings.data_dir, RecursiveMode::NonRecursive)?;
    debug!(path = %state.settings.data_dir.display(), "Watching for changes");

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            info!("Detected changes in data directory");
            if let Err(e) = state.reload().await {
                warn!(error = %e, "Failed to refresh");
            }
        }
    });

    Ok(debouncer)
}

/// Query string shared by the calendar endpoints
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub view: Option<String>,
    pub date: Option<String>,
}

/// A rejected query, answered with 400 and a plain message
#[derive(Debug)]
pub struct BadRequest(String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.0).into_response()
    }
}

impl CalendarQuery {
    /// View and reference date, defaulting to this month
    fn resolve(&self, today: NaiveDate) -> Result<(CalendarView, NaiveDate), BadRequest> {
        let view = match self.view.as_deref() {
            Some(raw) if !raw.is_empty() => raw
                .parse::<CalendarView>()
                .map_err(|e| BadRequest(e.to_string()))?,
            _ => CalendarView::default(),
        };
        let reference = match self.date.as_deref() {
            Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| BadRequest(format!("invalid date '{}' (expected YYYY-MM-DD)", raw)))?,
            _ => today,
        };
        Ok((view, reference))
    }
}

/// Serve the calendar page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Html<String>, BadRequest> {
    let now = Utc::now();
    let zone = state.settings.zone;
    let today = zone.today(now);
    let (view, reference) = query.resolve(today)?;

    let agenda = state.agenda.read().await;
    let cells = zone.build_cells(view, reference, today, &agenda.items());
    let page = CalendarPage::new(view, reference, cells);
    let homework = agenda.homework_status(now, zone);
    let summary = agenda.summary(now, zone);

    let markup = html::render_page(&page, &homework, &summary, today);
    Ok(Html(markup.into_string()))
}

/// Return a calendar grid as JSON
async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarPage>, BadRequest> {
    let zone = state.settings.zone;
    let today = zone.today(Utc::now());
    let (view, reference) = query.resolve(today)?;

    let agenda = state.agenda.read().await;
    let cells = zone.build_cells(view, reference, today, &agenda.items());
    Ok(Json(CalendarPage::new(view, reference, cells)))
}

/// Return homework with due status, earliest first
async fn homework_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HomeworkStatus>> {
    let agenda = state.agenda.read().await;
    Json(agenda.homework_status(Utc::now(), state.settings.zone))
}

async fn summary_handler(State(state): State<Arc<AppState>>) -> Json<StatusSummary> {
    let agenda = state.agenda.read().await;
    Json(agenda.summary(Utc::now(), state.settings.zone))
}

/// Refresh data from disk (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> &'static str {
    info!("Manual refresh triggered");

    match state.reload().await {
        Ok(_) => "OK",
        Err(e) => {
            warn!(error = %e, "Refresh failed");
            "ERROR"
        }
    }
}
