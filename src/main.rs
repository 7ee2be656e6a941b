use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod attendance;
mod cache;
mod config;
mod db;
mod error;
mod feedback;
mod locale;
mod models;
mod report;
mod rounds;
mod spreadsheet;

use crate::cache::CachePaths;
use crate::config::{FeedbackArgs, ReportArgs, DEFAULT_OUTPUT_DIR};

#[derive(Parser)]
#[command(name = "society-attendance")]
#[command(about = "Weekly attendance and participation reports for debate societies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Cache events, participants and feedback from the remote store as JSON
    Fetch {
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
        /// Refetch even when cache files already exist
        #[arg(long)]
        force: bool,
    },
    /// Weekly attendance and participation percentages
    Weekly {
        #[command(flatten)]
        args: ReportArgs,
        /// Also write attendance.xlsx
        #[arg(long)]
        xlsx: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Per-event rounds with their participants, as JSON and Excel
    Rounds {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Recent coach feedback for novice participants, as JSON
    Feedback {
        #[command(flatten)]
        args: FeedbackArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

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
        Commands::Fetch { output_dir, force } => {
            let cache = CachePaths::new(output_dir);
            cache.ensure_dir()?;
            if cache.is_complete() && !force {
                println!("Cache already present in {}.", cache.dir.display());
                return Ok(());
            }

            let pool = connect().await?;
            info!("retrieving events");
            let events = db::fetch_events(&pool).await?;
            info!("retrieving participants");
            let participants = db::fetch_participants(&pool).await?;
            info!("retrieving feedback");
            let feedbacks = db::fetch_feedbacks(&pool).await?;
            pool.close().await;

            cache.store_events(&events)?;
            cache.store_participants(&participants)?;
            cache.store_feedbacks(&feedbacks)?;
            println!(
                "Cached {} events, {} participants and {} feedback entries in {}.",
                events.len(),
                participants.len(),
                feedbacks.len(),
                cache.dir.display()
            );
        }
        Commands::Weekly { args, xlsx, limit } => {
            let query = args.query()?;
            let cache = CachePaths::new(&args.output_dir);
            let (events, participants) = load_cache(&cache)?;

            info!(society = %query.society, "calculating attendance");
            let report = attendance::build_report(&events, &participants, &query)?;
            report::write_report_files(&cache.dir, &report, query.locale)?;
            if xlsx {
                spreadsheet::write_attendance_workbook(
                    &cache.dir.join(spreadsheet::ATTENDANCE_WORKBOOK),
                    &report,
                    query.locale,
                )?;
            }

            print!("{}", report::build_summary(&query, &report, limit));
            println!("Reports written to {}.", cache.dir.display());
        }
        Commands::Rounds { args } => {
            let query = args.query()?;
            let cache = CachePaths::new(&args.output_dir);
            let (events, participants) = load_cache(&cache)?;

            info!(society = %query.society, "generating rounds");
            let attendance = attendance::filter_attendance(&events, &participants, &query)?;
            let rounds = rounds::build_rounds(&attendance);
            cache::write_json(&cache.dir.join("rounds.json"), &rounds::rounds_json(&rounds)?)?;
            spreadsheet::write_rounds_workbook(
                &cache.dir.join(spreadsheet::ROUNDS_WORKBOOK),
                &rounds,
                query.locale,
            )?;

            println!("Wrote {} rounds to {}.", rounds.len(), cache.dir.display());
        }
        Commands::Feedback { args } => {
            let query = args.query(Utc::now())?;
            let cache = CachePaths::new(&args.output_dir);
            let (events, participants) = load_cache(&cache)?;
            let feedbacks = cache
                .load_feedbacks()
                .with_context(|| format!("failed to read {}", cache.feedbacks().display()))?;

            info!(months = args.months, "collecting novice feedback");
            let report =
                feedback::build_feedback_report(&participants, &events, &feedbacks, &query)?;
            cache::write_json(
                &cache.dir.join(feedback::FEEDBACK_FILE),
                &feedback::feedback_json(&report)?,
            )?;

            println!(
                "Wrote feedback for {} novices to {}.",
                report.len(),
                cache.dir.join(feedback::FEEDBACK_FILE).display()
            );
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the attendance Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_cache(
    cache: &CachePaths,
) -> anyhow::Result<(Vec<models::Event>, Vec<models::Participant>)> {
    let events = cache
        .load_events()
        .with_context(|| format!("failed to read {}", cache.events().display()))?;
    let participants = cache
        .load_participants()
        .with_context(|| format!("failed to read {}", cache.participants().display()))?;
    Ok((events, participants))
}
