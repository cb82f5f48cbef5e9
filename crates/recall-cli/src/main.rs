//! recall — command-line driver for the recall-core memory and retrieval
//! engine.
//!
//! Thin binary: every subcommand parses its arguments, builds a `Config`
//! and a `Storage`, and calls straight into `recall_core`. No business
//! logic lives here.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use recall_core::{Config, EnvMode, ProjectTag, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recall")]
#[command(author = "Sam Valladares")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-project conversational memory and retrieval engine")]
struct Cli {
    /// Path to the SQLite database. Defaults to the platform data
    /// directory when unset.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a completed session into a structured memory record.
    IndexSession {
        session_id: String,
        /// Treat the session as tagged with this project for
        /// reconciliation purposes.
        #[arg(long)]
        override_project: Option<String>,
        /// When the effective session tag is `general`, keep it that way
        /// regardless of what the organizer model proposes.
        #[arg(long)]
        preserve_project: bool,
    },

    /// List memory records, optionally filtered by project.
    ListMemories {
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one memory record in full.
    ViewMemory { session_id: String },

    /// Alias of `index-session`.
    RefreshMemory {
        session_id: String,
        #[arg(long)]
        override_project: Option<String>,
        #[arg(long)]
        preserve_project: bool,
    },

    /// Hard-delete a memory record. The session itself is left untouched.
    DeleteMemory { session_id: String },

    /// Recompute embeddings for memory records missing one.
    BackfillEmbeddings {
        #[arg(long)]
        project: Option<String>,
    },

    /// Walk and index a source repository.
    IndexCode {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, value_delimiter = ',')]
        production_targets: Vec<String>,
    },

    /// Recompute embeddings for code chunks missing one.
    BackfillCodeEmbeddings {
        #[arg(long)]
        repository: Option<String>,
    },
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "recall", "core")
        .map(|dirs| dirs.data_dir().join("recall.db"))
        .unwrap_or_else(|| PathBuf::from("recall.db"))
}

fn build_config(db_path: Option<PathBuf>) -> Config {
    let db_path = db_path.unwrap_or_else(default_db_path);
    let mut config = Config::new(db_path);

    if let Ok(mode) = std::env::var("ENV_MODE") {
        if mode.eq_ignore_ascii_case("development") {
            config.env_mode = EnvMode::Mock;
        }
    }
    if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
        config.ollama_base_url = url;
    }
    if let Ok(model) = std::env::var("OLLAMA_MODEL") {
        config.ollama_model = model;
    }
    if let Ok(secs) = std::env::var("OLLAMA_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()) {
        config.ollama_timeout = Duration::from_secs(secs);
    }
    if let Ok(k) = std::env::var("DAAS_VECTOR_TOP_K").ok().and_then(|s| s.parse().ok()) {
        config.daas_vector_top_k = k;
    }
    if let Ok(v) = std::env::var("CONVERSATION_INDEX_VERSION").ok().and_then(|s| s.parse().ok()) {
        config.conversation_index_version = v;
    }

    config
}

fn parse_project(raw: Option<&str>) -> Option<ProjectTag> {
    raw.map(recall_core::normalize_project_tag)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.db_path);
    let storage = Storage::new(&config)?;

    match cli.command {
        Commands::IndexSession {
            session_id,
            override_project,
            preserve_project,
        } => {
            commands::index_session::run(
                &storage,
                &config,
                &session_id,
                parse_project(override_project.as_deref()),
                preserve_project,
            )
            .await
        }
        Commands::ListMemories { project, limit } => {
            commands::list_memories::run(&storage, parse_project(project.as_deref()), limit)
        }
        Commands::ViewMemory { session_id } => commands::view_memory::run(&storage, &session_id),
        Commands::RefreshMemory {
            session_id,
            override_project,
            preserve_project,
        } => {
            commands::index_session::run(
                &storage,
                &config,
                &session_id,
                parse_project(override_project.as_deref()),
                preserve_project,
            )
            .await
        }
        Commands::DeleteMemory { session_id } => commands::delete_memory::run(&storage, &session_id),
        Commands::BackfillEmbeddings { project } => {
            commands::backfill_embeddings::run(&storage, &config, parse_project(project.as_deref()))
        }
        Commands::IndexCode {
            path,
            name,
            production_targets,
        } => commands::index_code::run(&storage, &config, &path, &name, &production_targets),
        Commands::BackfillCodeEmbeddings { repository } => {
            commands::backfill_code_embeddings::run(&storage, &config, repository.as_deref())
        }
    }
}
