use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod bucket;
mod config;
mod data;
mod format;
mod grid;
mod html;
mod server;
mod status;
mod types;

use config::Settings;
use grid::{CalendarPage, CalendarView};

#[derive(Parser, Debug)]
#[command(name = "agenda")]
#[command(about = "Homework and event calendars from school API data")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding homework.json and events.json [env: AGENDA_DATA_DIR]
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    /// Viewer time zone: 'local' or an IANA name [env: AGENDA_TZ]
    #[arg(long, global = true)]
    tz: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Render a static index.html (no server)
    Build {
        #[arg(long, default_value = "month")]
        view: CalendarView,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print a calendar grid to the terminal
    Grid {
        #[arg(long, default_value = "month")]
        view: CalendarView,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List everything due on one day
    Day {
        /// Day to list (YYYY-MM-DD), defaults to today
        date: Option<NaiveDate>,
    },

    /// Summarize homework by due status
    Status,
}

fn init_tracing(log_level: &str) {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    for directive in ["hyper=warn", "tower_http=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

fn load_page(
    settings: &Settings,
    agenda: &data::Agenda,
    view: CalendarView,
    date: Option<NaiveDate>,
) -> (CalendarPage, NaiveDate) {
    let today = settings.zone.today(Utc::now());
    let reference = date.unwrap_or(today);
    let cells = settings
        .zone
        .build_cells(view, reference, today, &agenda.items());
    (CalendarPage::new(view, reference, cells), today)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let settings = Settings::resolve(args.data_dir, args.output, args.tz)?;

    match args.command {
        // Default to serve if no command specified
        None => {
            server::serve(8080, settings).await?;
        }
        Some(Commands::Serve { port }) => {
            server::serve(port, settings).await?;
        }
        Some(Commands::Build { view, date }) => {
            let agenda = data::load_agenda(&settings.data_dir)?;
            let now = Utc::now();
            let (page, today) = load_page(&settings, &agenda, view, date);
            let homework = agenda.homework_status(now, settings.zone);
            let summary = agenda.summary(now, settings.zone);

            std::fs::create_dir_all(&settings.output_dir)?;
            let html_path = settings.output_dir.join("index.html");
            html::generate_html(&page, &homework, &summary, today, &html_path)?;
            info!(path = %html_path.display(), title = %page.title, "HTML saved");
        }
        Some(Commands::Grid { view, date }) => {
            let agenda = data::load_agenda(&settings.data_dir)?;
            let (page, _) = load_page(&settings, &agenda, view, date);
            println!("{}", format::text_grid(&page));
        }
        Some(Commands::Day { date }) => {
            let agenda = data::load_agenda(&settings.data_dir)?;
            let day = date.unwrap_or_else(|| settings.zone.today(Utc::now()));
            let items = agenda.items();
            let due: Vec<_> = settings
                .zone
                .bucket_by_date(&items, day)
                .into_iter()
                .cloned()
                .collect();
            let due = settings.zone.sort_by_due(&due);

            println!("{}", format::friendly_date(day));
            if due.is_empty() {
                println!("  nothing due");
            }
            for item in due {
                println!("  - {}", item.title);
            }
        }
        Some(Commands::Status) => {
            let agenda = data::load_agenda(&settings.data_dir)?;
            let now = Utc::now();
            let summary = agenda.summary(now, settings.zone);

            for status in types::DueStatus::ALL {
                println!("{:<14}{}", status.label(), summary.count(status));
            }
            if summary.undated > 0 {
                println!("{:<14}{}", "No due date", summary.undated);
            }
            println!();

            for hw in agenda.homework_status(now, settings.zone) {
                if hw.status == types::DueStatus::Assigned {
                    continue;
                }
                println!(
                    "[{}] {} ({}) due {}",
                    hw.status.as_str(),
                    hw.title,
                    hw.subject,
                    format::relative_due_label(hw.due_in_days)
                );
            }
        }
    }

    Ok(())
}
