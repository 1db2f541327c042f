//! Run configured LLM tasks and inspect their logs from the command line.
//!
//! Reads the API key from the environment variable named in the config
//! (default `OPENAI_API_KEY`); a `.env` file in the working directory is
//! loaded first.
//!
//! # Examples
//!
//! ```sh
//! # Content moderation
//! taskroute moderate --content "Buy cheap watches!!!"
//!
//! # Theme extraction with a custom task from taskroute.toml
//! taskroute theme --requirements "Onboarding took forever" --task support_triage
//!
//! # Translation (stubbed, no network call)
//! taskroute translate --source-language English --target-language Spanish \
//!   --text "Hello, how are you?"
//!
//! # Last 20 interactions as JSON
//! taskroute recent --limit 20 --json
//!
//! # Review queue
//! taskroute feedback list --reason "vague response" --keyword refund
//! taskroute feedback export --task moderator --out flagged.csv
//! taskroute feedback validate --file feedback_queue.jsonl
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use taskroute::prelude::*;
use taskroute::review::export;
use taskroute::review::validate::validate_feedback_file;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Route LLM tasks to their configured models and review the results.
#[derive(Parser)]
#[command(name = "taskroute", version)]
struct Cli {
    /// Config file (default: taskroute.toml in the working directory, if present)
    #[arg(long, global = true, env = "TASKROUTE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review content for inappropriate, harmful, or unsafe material
    Moderate {
        /// Content to review
        #[arg(long)]
        content: String,

        /// Task id to run
        #[arg(long, default_value = "moderator")]
        task: String,
    },

    /// Extract the main themes from user feedback
    Theme {
        /// Feedback text to analyze
        #[arg(long)]
        requirements: String,

        /// Task id to run
        #[arg(long, default_value = "theme_coder")]
        task: String,
    },

    /// Translate text between languages
    Translate {
        #[arg(long)]
        source_language: String,

        #[arg(long)]
        target_language: String,

        /// Text to translate
        #[arg(long)]
        text: String,

        /// Task id to run
        #[arg(long, default_value = "translator")]
        task: String,
    },

    /// Show the most recent logged interactions, newest first
    Recent {
        /// Number of records to show
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Work with the human feedback queue
    #[command(subcommand)]
    Feedback(FeedbackCommand),
}

#[derive(Subcommand)]
enum FeedbackCommand {
    /// List feedback records matching the filters
    List(FilterArgs),

    /// Export feedback records matching the filters as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check every line of a feedback file for required fields
    Validate {
        /// Feedback file (default: the configured feedback path)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only records for this task
    #[arg(long)]
    task: Option<String>,

    /// Only records with this reason ("Vague response", "Poor follow-up",
    /// "Incorrect information", "Other")
    #[arg(long)]
    reason: Option<FeedbackReason>,

    /// Case-insensitive keyword in the prompt or response
    #[arg(long)]
    keyword: Option<String>,
}

impl From<FilterArgs> for FeedbackFilter {
    fn from(args: FilterArgs) -> Self {
        FeedbackFilter {
            task: args.task,
            reason: args.reason,
            keyword: args.keyword,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build a router for `task_id`. The API key is only required when the task
/// actually calls the completion API.
fn build_router(settings: Settings, task_id: &str) -> taskroute::Result<TaskRouter> {
    let kind = settings.catalog.resolve_task(task_id)?.kind;
    let api_key = match kind {
        TaskKind::Translation => settings.completion.api_key().unwrap_or_default(),
        _ => settings.completion.api_key()?,
    };
    let client = ChatClient::new(
        &settings.completion.base_url,
        api_key,
        Duration::from_secs(settings.completion.timeout_secs),
    )?;
    let stores = open_stores(&settings.storage)?;
    Ok(TaskRouter::new(
        settings.catalog,
        settings.prompts,
        Arc::new(client),
        stores.logs,
    ))
}

fn review_service(settings: &Settings) -> taskroute::Result<ReviewService> {
    let stores = open_stores(&settings.storage)?;
    Ok(ReviewService::new(
        stores.logs,
        stores.feedback,
        settings.review.log_window,
    ))
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let mut out: String = flat.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

fn describe_record(record: &InteractionRecord) -> String {
    let version = record.prompt_version.as_deref().unwrap_or("-");
    let outcome = match &record.error {
        Some(e) => format!("ERROR {}", truncate(e, 80)),
        None => truncate(&record.response, 80),
    };
    format!(
        "[{}] {} ({}, {}) {}",
        record.timestamp, record.task, record.model, version, outcome
    )
}

fn describe_feedback(record: &FeedbackRecord) -> String {
    let mut line = format!(
        "{}  [{}] {} | {} | reviewed: {}",
        record.id,
        record.log.timestamp,
        record.log.task,
        record.reason,
        if record.reviewed { "yes" } else { "no" }
    );
    line.push_str(&format!("\n    prompt:   {}", truncate(&record.log.prompt, 100)));
    line.push_str(&format!("\n    response: {}", truncate(&record.log.response, 100)));
    if !record.comment.is_empty() {
        line.push_str(&format!("\n    comment:  {}", truncate(&record.comment, 100)));
    }
    line
}

async fn run(cli: Cli) -> taskroute::Result<()> {
    if let Command::Feedback(FeedbackCommand::Validate { file: Some(path) }) = &cli.command {
        return validate(path);
    }

    let settings = Settings::load(cli.config.as_deref())?;
    debug!("Storage backend: {:?}", settings.storage.backend);

    match cli.command {
        Command::Moderate { content, task } => {
            let router = build_router(settings, &task)?;
            let out = router.run_task(&task, &TaskArgs::moderation(content)).await?;
            println!("{out}");
        }
        Command::Theme { requirements, task } => {
            let router = build_router(settings, &task)?;
            let out = router.run_task(&task, &TaskArgs::theme(requirements)).await?;
            println!("{out}");
        }
        Command::Translate {
            source_language,
            target_language,
            text,
            task,
        } => {
            let router = build_router(settings, &task)?;
            let args = TaskArgs::translation(source_language, target_language, text);
            let out = router.run_task(&task, &args).await?;
            println!("{out}");
        }
        Command::Recent { limit, json } => {
            let stores = open_stores(&settings.storage)?;
            let records = stores.logs.recent(limit).await?;
            if records.is_empty() && !json {
                eprintln!("No logged interactions.");
            }
            for record in &records {
                if json {
                    let line = serde_json::to_string(record)
                        .map_err(|e| Error::io("failed to encode record", e))?;
                    println!("{line}");
                } else {
                    println!("{}", describe_record(record));
                }
            }
        }
        Command::Feedback(FeedbackCommand::List(filter)) => {
            let service = review_service(&settings)?;
            let records = service.list(&filter.into()).await?;
            eprintln!("Showing {} feedback entries", records.len());
            for record in &records {
                println!("{}", describe_feedback(record));
            }
        }
        Command::Feedback(FeedbackCommand::Export { filter, out }) => {
            let service = review_service(&settings)?;
            let records = service.list(&filter.into()).await?;
            let csv = export::to_csv(&records);
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .map_err(|e| Error::io(&format!("failed to write {}", path.display()), e))?;
                    eprintln!("Exported {} records to {}", records.len(), path.display());
                }
                None => print!("{csv}"),
            }
        }
        Command::Feedback(FeedbackCommand::Validate { file: None }) => {
            return validate(&settings.storage.feedback_path);
        }
        Command::Feedback(FeedbackCommand::Validate { file: Some(path) }) => {
            return validate(&path);
        }
    }
    Ok(())
}

/// Print the report. Neither invalid entries nor an unreadable file make
/// the command fail.
fn validate(path: &Path) -> taskroute::Result<()> {
    match validate_feedback_file(path) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("{}", unreadable(path, e)),
    }
    Ok(())
}

fn unreadable(path: &Path, err: std::io::Error) -> Error {
    Error::io(&format!("failed to read {}", path.display()), err)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
