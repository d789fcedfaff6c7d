use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attendance_ledger::config::{EngineConfig, ViewProfile};
use attendance_ledger::engine::Dashboard;
use attendance_ledger::error::LedgerError;
use attendance_ledger::filter::{EventFilter, ModeSelector};
use attendance_ledger::models::{self, DateRange, Roster};
use attendance_ledger::prefs::{JsonFileStore, PreferenceStore, Preferences};
use attendance_ledger::{db, normalize, report, student};

#[derive(Parser)]
#[command(name = "attendance-ledger")]
#[command(about = "Attendance streaks, statistics and presence reports", long_about = None)]
struct Cli {
    /// Read events from a JSON snapshot instead of Postgres
    #[arg(long, env = "ATTENDANCE_SNAPSHOT", global = true)]
    snapshot: Option<PathBuf>,
    /// JSON object of studentId -> name for students with no check-ins yet
    #[arg(long, env = "ATTENDANCE_ROSTER", global = true)]
    roster: Option<PathBuf>,
    /// Where display preferences are kept between runs
    #[arg(
        long,
        env = "ATTENDANCE_PREFS",
        default_value = ".attendance-ledger.json",
        global = true
    )]
    prefs: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct ViewArgs {
    /// Case-insensitive match on student name or id
    #[arg(long, default_value = "")]
    search: String,
    /// Capture mode to keep, or "all"
    #[arg(long, default_value = "all")]
    mode: ModeSelector,
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,
    /// Dashboard profile deciding which modes count as present
    #[arg(long, value_enum)]
    view: Option<ViewProfile>,
    /// Modes counted as present for percentages (repeatable)
    #[arg(long = "percentage-mode")]
    percentage_modes: Vec<String>,
    /// Modes that extend a streak (repeatable)
    #[arg(long = "streak-mode")]
    streak_modes: Vec<String>,
}

impl ViewArgs {
    fn filter(&self) -> EventFilter {
        EventFilter::new(
            self.search.clone(),
            self.mode.clone(),
            DateRange::new(self.from, self.to),
        )
    }

    fn config(&self, fallback: ViewProfile) -> Result<EngineConfig, LedgerError> {
        self.view
            .unwrap_or(fallback)
            .config()
            .with_overrides(&self.percentage_modes, &self.streak_modes)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// Print the stored preferences
    Show,
    /// Update the stored preferences
    Set {
        #[arg(long, value_enum)]
        view: Option<ViewProfile>,
        #[arg(long)]
        dark_mode: Option<bool>,
    },
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import check-ins from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a manual check-in for one student
    Mark {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, default_value = "N/A")]
        time: String,
        #[arg(long)]
        reason: Option<String>,
        /// Replace an existing record for the same day
        #[arg(long)]
        overwrite: bool,
    },
    /// Record manual check-ins for many students on one day
    BulkMark {
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, default_value = "N/A")]
        time: String,
        #[arg(long)]
        reason: Option<String>,
        /// Student as ID=NAME (repeatable)
        #[arg(long = "student", value_parser = parse_student_arg, required = true)]
        students: Vec<(String, String)>,
    },
    /// List filtered check-ins with each student's current streak
    Events {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Present/total/percentage per student
    Stats {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        json: bool,
    },
    /// Distinct capture modes in the data
    Modes,
    /// Write the presence matrix or a summary report
    Export {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
        #[arg(long, default_value = "attendance_report.csv")]
        out: PathBuf,
    },
    /// Summary for a single student
    Student {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = student::parse_month)]
        month: Option<String>,
        #[arg(long, value_parser = parse_date_arg, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg, requires = "from")]
        to: Option<NaiveDate>,
        #[arg(long, value_enum)]
        view: Option<ViewProfile>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show or change stored display preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, LedgerError> {
    normalize::parse_day(raw).ok_or_else(|| LedgerError::InvalidDate(raw.to_string()))
}

fn parse_student_arg(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, name)) if !id.trim().is_empty() && !name.trim().is_empty() => {
            Ok((id.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(format!("expected ID=NAME, got '{raw}'")),
    }
}

fn read_roster(path: &Path) -> Result<Roster, LedgerError> {
    let value = read_snapshot(path)?;
    Ok(value
        .as_object()
        .map(|students| {
            students
                .iter()
                .map(|(id, name)| {
                    let name = name.as_str().unwrap_or(models::NOT_AVAILABLE);
                    (id.clone(), name.to_string())
                })
                .collect()
        })
        .unwrap_or_default())
}

fn read_snapshot(path: &Path) -> Result<Value, LedgerError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LedgerError::SnapshotRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LedgerError::SnapshotParse {
        path: path.to_path_buf(),
        source,
    })
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when no --snapshot is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_dashboard(
    snapshot: Option<&Path>,
    roster: Option<&Path>,
    config: EngineConfig,
) -> anyhow::Result<Dashboard> {
    let mut dashboard = Dashboard::new(config);

    match snapshot {
        Some(path) => {
            let value = read_snapshot(path)?;
            dashboard.push_snapshot(Some(&value));
            if let Some(roster) = roster {
                dashboard.set_registered(read_roster(roster)?);
            }
            tracing::info!(path = %path.display(), events = dashboard.events().len(), "snapshot loaded");
        }
        None => {
            let pool = connect().await?;
            let value = db::fetch_snapshot(&pool).await?;
            dashboard.push_snapshot(Some(&value));
            dashboard.set_registered(db::fetch_roster(&pool).await?);
            tracing::info!(events = dashboard.events().len(), "snapshot fetched from Postgres");
        }
    }

    Ok(dashboard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_ledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.prefs);
    let prefs = store.load()?;
    let snapshot = cli.snapshot.as_deref();
    let roster = cli.roster.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} check-ins from {}.", csv.display());
        }
        Commands::Mark {
            student_id,
            name,
            date,
            time,
            reason,
            overwrite,
        } => {
            let pool = connect().await?;
            let entry = db::ManualEntry {
                date,
                student_id,
                name,
                time,
                reason,
            };
            match db::mark_manual(&pool, &entry, overwrite).await? {
                db::MarkOutcome::Inserted => {
                    println!("Marked {} present on {}.", entry.student_id, entry.date)
                }
                db::MarkOutcome::Overwritten => {
                    println!("Replaced the record for {} on {}.", entry.student_id, entry.date)
                }
                db::MarkOutcome::KeptExisting => println!(
                    "{} already has a record on {}; pass --overwrite to replace it.",
                    entry.student_id, entry.date
                ),
            }
        }
        Commands::BulkMark {
            date,
            time,
            reason,
            students,
        } => {
            let pool = connect().await?;
            let written = db::bulk_mark(&pool, date, &time, reason.as_deref(), &students).await?;
            println!("{written} check-ins recorded for {date}.");
        }
        Commands::Events { view, limit } => {
            let mut dashboard = load_dashboard(snapshot, roster, view.config(prefs.view)?).await?;
            let filtered = dashboard.view(&view.filter());

            if filtered.filtered.is_empty() {
                println!("No records match your search or filter.");
                return Ok(());
            }

            for event in filtered.filtered.iter().take(limit) {
                let streak = dashboard.streak(&event.student_id);
                println!(
                    "{}  {:<12} {:<24} {:<8} {:<14} streak {}",
                    event.date, event.student_id, event.student_name, event.time, event.mode, streak
                );
            }
            if filtered.filtered.len() > limit {
                println!("... {} more", filtered.filtered.len() - limit);
            }
        }
        Commands::Stats { view, json } => {
            let mut dashboard = load_dashboard(snapshot, roster, view.config(prefs.view)?).await?;
            let roster = dashboard.roster();
            let result = dashboard.view(&view.filter());

            if json {
                println!("{}", serde_json::to_string_pretty(&result.stats)?);
                return Ok(());
            }
            if result.stats.is_empty() {
                println!("No students on record.");
                return Ok(());
            }
            for (id, stats) in &result.stats {
                println!(
                    "- {} ({}) {}/{} present, {:.2}%",
                    roster.get(id).map(String::as_str).unwrap_or("N/A"),
                    id,
                    stats.present,
                    stats.total,
                    stats.percentage
                );
            }
        }
        Commands::Modes => {
            let mut dashboard = load_dashboard(snapshot, roster, EngineConfig::default()).await?;
            for mode in dashboard.modes() {
                println!("{mode}");
            }
        }
        Commands::Export { view, format, out } => {
            let mut dashboard = load_dashboard(snapshot, roster, view.config(prefs.view)?).await?;
            let filter = view.filter();
            let result = dashboard.view(&filter);

            match format {
                ExportFormat::Csv => {
                    let file = std::fs::File::create(&out)
                        .with_context(|| format!("failed to create {}", out.display()))?;
                    report::write_matrix_csv(&result.matrix, file)?;
                }
                ExportFormat::Markdown => {
                    let roster = dashboard.roster();
                    let streaks = dashboard.streaks();
                    std::fs::write(&out, report::build_report(&filter, &result, &roster, &streaks))?;
                }
                ExportFormat::Json => {
                    std::fs::write(&out, serde_json::to_string_pretty(&result.matrix)?)?;
                }
            }
            tracing::info!(rows = result.matrix.rows.len(), dates = result.matrix.dates.len(), "report exported");
            println!("Report written to {}.", out.display());
        }
        Commands::Student {
            id,
            month,
            from,
            to,
            view,
            out,
        } => {
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    return Err(LedgerError::InvertedRange {
                        from: from.to_string(),
                        to: to.to_string(),
                    }
                    .into());
                }
            }
            let config = view.unwrap_or(ViewProfile::Student).config();
            let dashboard = load_dashboard(snapshot, roster, config.clone()).await?;
            let events = dashboard.events();

            let summary = student::student_summary(events, &id, month.as_deref());
            let records = student::records_for(events, &id);
            let shown = student::in_month(&records, month.as_deref());

            if records.is_empty() {
                println!("No attendance records found for {id}.");
            }
            let output = report::build_student_report(&shown, &summary);
            print!("{output}");

            let weeks = student::weekly_summary(&shown);
            for (week, present) in &weeks {
                println!("Week {week}: {present} present");
            }

            if let (Some(from), Some(to)) = (from, to) {
                let range =
                    student::range_summary(events, &id, from, to, &config.percentage_modes);
                println!(
                    "{} to {}: {} present, {} absent",
                    range.from, range.to, range.present, range.absent
                );
            }

            if let Some(out) = out {
                std::fs::write(&out, output)?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Prefs { command } => match command {
            PrefsCommand::Show => {
                println!("{}", serde_json::to_string_pretty(&prefs)?);
            }
            PrefsCommand::Set { view, dark_mode } => {
                let updated = Preferences {
                    view: view.unwrap_or(prefs.view),
                    dark_mode: dark_mode.unwrap_or(prefs.dark_mode),
                };
                store.save(&updated)?;
                tracing::info!(path = %store.path().display(), "preferences saved");
                println!("{}", serde_json::to_string_pretty(&updated)?);
            }
        },
    }

    Ok(())
}
