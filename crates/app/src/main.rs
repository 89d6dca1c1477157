use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use progression_core::model::{LearnerId, LessonId, LessonType, Level, ProgressStatus};
use services::{AppServices, Clock, LessonFilter, ProgressSubmission, ServiceConfig, ServiceError};

/// Lesson gating, progress tracking and study recommendations for language learners.
#[derive(Parser)]
#[command(name = "lingo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lesson progression and access control", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database URL or path
    #[arg(
        long = "db",
        env = "LINGO_DB_URL",
        default_value = "sqlite://lingo.sqlite3",
        global = true
    )]
    db_url: String,

    /// Extra tries a submission gets after a conflicting write
    #[arg(
        long,
        env = "LINGO_MAX_WRITE_RETRIES",
        default_value_t = ServiceConfig::DEFAULT_MAX_WRITE_RETRIES,
        global = true
    )]
    max_write_retries: u32,

    /// Recommendation count when `recommend` gets no --limit
    #[arg(
        long,
        env = "LINGO_RECOMMEND_LIMIT",
        default_value_t = ServiceConfig::DEFAULT_RECOMMENDATION_LIMIT,
        global = true
    )]
    recommend_limit: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the sample Norwegian catalog and a demo learner
    Seed,

    /// List lessons at or below the learner's level
    Lessons {
        #[arg(long)]
        learner: LearnerId,
        /// Only lessons at this level (A1..C2)
        #[arg(long)]
        level: Option<Level>,
        /// Only lessons of this type: vocabulary, grammar, listening, speaking
        #[arg(long = "type")]
        lesson_type: Option<LessonType>,
    },

    /// Show one lesson with the learner's progress and access decision
    Lesson {
        #[arg(long)]
        learner: LearnerId,
        #[arg(long)]
        lesson: LessonId,
    },

    /// Record an attempt on a lesson
    Submit {
        #[arg(long)]
        learner: LearnerId,
        #[arg(long)]
        lesson: LessonId,
        /// in_progress, completed or mastered
        #[arg(long)]
        status: ProgressStatus,
        /// Score from 0 to 100
        #[arg(long, allow_negative_numbers = true)]
        score: Option<i64>,
        /// Seconds spent in this attempt
        #[arg(long = "time-spent", default_value = "0", allow_negative_numbers = true)]
        time_spent_secs: i64,
    },

    /// Completion summary and per-lesson progress
    Summary {
        #[arg(long)]
        learner: LearnerId,
    },

    /// Next lessons to study, easiest first
    Recommend {
        #[arg(long)]
        learner: LearnerId,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{text}");
    Ok(())
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// `SQLite` will not create a missing file through a plain URL, so touch it first.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database URL: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;

    let config = ServiceConfig {
        max_write_retries: cli.max_write_retries,
        default_recommendation_limit: cli.recommend_limit,
    };
    debug!(db = %db_url, ?config, "opening storage");
    let app = AppServices::new_sqlite(&db_url, Clock::default(), config)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match cli.command {
        Commands::Seed => {
            let report = app.seed_sample_data().await?;
            info!(
                lessons = report.lessons,
                quizzes = report.quizzes,
                learners = report.learners,
                "sample data loaded"
            );
            print_json(&serde_json::json!({
                "lessons": report.lessons,
                "quizzes": report.quizzes,
                "learners": report.learners,
            }))
        }
        Commands::Lessons {
            learner,
            level,
            lesson_type,
        } => {
            let filter = LessonFilter { level, lesson_type };
            print_json(&app.lessons().list(learner, filter).await?)
        }
        Commands::Lesson { learner, lesson } => {
            print_json(&app.lessons().detail(learner, lesson).await?)
        }
        Commands::Submit {
            learner,
            lesson,
            status,
            score,
            time_spent_secs,
        } => {
            let record = app
                .progress()
                .submit(ProgressSubmission {
                    learner_id: learner,
                    lesson_id: lesson,
                    status,
                    score,
                    time_spent_secs,
                })
                .await?;
            print_json(&record)
        }
        Commands::Summary { learner } => print_json(&app.progress().overview(learner).await?),
        Commands::Recommend { learner, limit } => {
            print_json(&app.progress().recommendations(learner, limit).await?)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        // Rejected requests exit 2, faults exit 1.
        let rejected = err
            .downcast_ref::<ServiceError>()
            .is_some_and(ServiceError::is_client_error);
        std::process::exit(if rejected { 2 } else { 1 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn submit_parses_typed_arguments() {
        let cli = Cli::try_parse_from([
            "lingo", "submit", "--learner", "1", "--lesson", "3", "--status", "completed",
            "--score", "85", "--time-spent", "900",
        ])
        .unwrap();
        let Commands::Submit {
            learner,
            lesson,
            status,
            score,
            time_spent_secs,
        } = cli.command
        else {
            panic!("expected submit");
        };
        assert_eq!(learner, LearnerId::new(1));
        assert_eq!(lesson, LessonId::new(3));
        assert_eq!(status, ProgressStatus::Completed);
        assert_eq!(score, Some(85));
        assert_eq!(time_spent_secs, 900);
    }

    #[test]
    fn unknown_level_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["lingo", "lessons", "--learner", "1", "--level", "D1"]);
        assert!(err.is_err());
    }

    #[test]
    fn shared_memory_urls_pass_through() {
        let url = "sqlite:file:memdb?mode=memory&cache=shared";
        assert_eq!(normalize_sqlite_url(url), url);
        assert!(normalize_sqlite_url("data/lingo.sqlite3").starts_with("sqlite:///"));
    }
}
