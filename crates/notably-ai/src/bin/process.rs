//! notably-process: run AI processing for a single note from the command line.
//!
//! Prints the structured operation result as JSON on stdout; logs go to
//! stderr (or `LOG_FILE`).

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use notably_ai::{generate_both_with_backup, AiConfig, AiOperations, BackupStore, StaticIdentity};
use notably_core::{ErrorMonitor, Note, NoteStore};
use notably_db::{log_pool_metrics, Database, InMemoryNoteStore, PoolConfig};
use notably_inference::OllamaBackend;

#[derive(Parser)]
#[command(name = "notably-process")]
#[command(author, version, about = "Generate AI summaries and tags for notably notes")]
#[command(propagate_version = true)]
struct Cli {
    /// Id of the user the note belongs to
    #[arg(short, long, env = "NOTABLY_USER")]
    user: String,

    /// Print the error monitor snapshot after the run
    #[arg(long)]
    show_monitor: bool,

    /// Use an in-memory note built from --title/--content instead of PostgreSQL
    #[arg(long)]
    dry_run: bool,

    /// Note title for --dry-run
    #[arg(long, default_value = "")]
    title: String,

    /// Note content for --dry-run
    #[arg(long, default_value = "")]
    content: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a summary
    Summary { note: String },

    /// Generate tags
    Tags { note: String },

    /// Generate summary and tags together, rolling back on total failure
    Both { note: String },

    /// Store a hand-written summary
    SetSummary { note: String, text: String },

    /// Store hand-written tags
    SetTags {
        note: String,
        #[arg(required = true, num_args = 1..)]
        tags: Vec<String>,
    },
}

impl Commands {
    fn note_id(&self) -> &str {
        match self {
            Commands::Summary { note }
            | Commands::Tags { note }
            | Commands::Both { note }
            | Commands::SetSummary { note, .. }
            | Commands::SetTags { note, .. } => note,
        }
    }
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "notably_ai=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notably_ai=info,notably_inference=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notably-process.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // stdout carries the JSON result
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

async fn open_store(cli: &Cli) -> anyhow::Result<Arc<dyn NoteStore>> {
    if cli.dry_run {
        let note = Note::new(cli.command.note_id(), &cli.user, &cli.title, &cli.content);
        info!(note_id = %note.id, "Dry run with in-memory note");
        return Ok(Arc::new(InMemoryNoteStore::new().with_note(note)));
    }

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set (or use --dry-run)")?;
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env())
        .await
        .context("failed to connect to database")?;
    log_pool_metrics(db.pool());
    Ok(Arc::new(db.notes))
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let store = open_store(&cli).await?;
    let backend = OllamaBackend::from_env();
    if !backend.health_check().await? {
        warn!(url = backend.base_url(), "Ollama is not reachable, requests will likely fail");
    }

    let monitor = Arc::new(ErrorMonitor::new());
    let ops = AiOperations::new(
        Arc::new(StaticIdentity::signed_in(&cli.user)),
        store.clone(),
        Arc::new(backend),
        monitor.clone(),
    )
    .with_config(AiConfig::from_env());

    let (output, success) = match &cli.command {
        Commands::Summary { note } => {
            let r = ops.generate_summary(note).await;
            (serde_json::to_value(&r)?, r.success)
        }
        Commands::Tags { note } => {
            let r = ops.generate_tags(note).await;
            (serde_json::to_value(&r)?, r.success)
        }
        Commands::Both { note } => {
            let backups = BackupStore::new();
            let r =
                generate_both_with_backup(&ops, store.as_ref(), &backups, &cli.user, note).await;
            (serde_json::to_value(&r)?, r.success)
        }
        Commands::SetSummary { note, text } => {
            let r = ops.update_summary(note, text).await;
            (serde_json::to_value(&r)?, r.success)
        }
        Commands::SetTags { note, tags } => {
            let r = ops.update_tags(note, tags).await;
            (serde_json::to_value(&r)?, r.success)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    if cli.show_monitor {
        println!("{}", serde_json::to_string_pretty(&monitor.snapshot())?);
    }
    Ok(success)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _guard = init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
