use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use coqa_rag::rag::ingest;
use coqa_rag::session::ChatSession;
use coqa_rag::state::AppState;

#[derive(Parser)]
#[command(name = "coqa-rag")]
#[command(about = "Chat with an LLM grounded in a vector store of stories and Q&A pairs")]
#[command(version)]
pub struct Cli {
    /// Path to config.yml (overrides COQA_RAG_CONFIG_PATH)
    #[arg(long, global = true, env = "COQA_RAG_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start an interactive chat session (default)
    Chat,
    /// Load a JSON array of {question, answer, context} entries
    Ingest {
        /// Dataset file to ingest
        file: PathBuf,
        /// Remove existing stories before ingesting
        #[arg(long)]
        clear: bool,
    },
    /// Show store counts and embedding dimensionality
    Stats,
}

enum ReplInput<'a> {
    Exit,
    Reset,
    Skip,
    Query(&'a str),
}

fn classify(line: &str) -> ReplInput<'_> {
    match line.trim() {
        "" => ReplInput::Skip,
        "/exit" | "/quit" => ReplInput::Exit,
        "/reset" => ReplInput::Reset,
        query => ReplInput::Query(query),
    }
}

fn prompt_user() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run_chat(state: &AppState) -> anyhow::Result<()> {
    if !state.llm.health_check().await.unwrap_or(false) {
        tracing::warn!(base_url = %state.config.llm.base_url, "LLM server did not answer the health check");
    }

    let pipeline = state.pipeline();
    let mut session = ChatSession::new();
    println!("{}", session.greeting());
    prompt_user();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match classify(&line) {
            ReplInput::Exit => break,
            ReplInput::Skip => {}
            ReplInput::Reset => {
                session = ChatSession::new();
                println!("{}", session.greeting());
            }
            ReplInput::Query(query) => match pipeline.handle_turn(&mut session, query).await {
                Ok(outcome) => println!("{}", outcome.reply),
                Err(err) => {
                    tracing::warn!(kind = err.kind(), "Turn failed: {}", err);
                    eprintln!("error: {}", err);
                }
            },
        }
        prompt_user();
    }

    tracing::info!(
        session_id = %session.id(),
        started_at = %session.started_at(),
        turns = session.turn_count() / 2,
        "Chat session ended"
    );
    Ok(())
}

pub async fn run_ingest(state: &AppState, file: &Path, clear: bool) -> anyhow::Result<()> {
    if clear {
        state
            .store
            .clear()
            .await
            .context("Failed to clear vector store")?;
    }

    let report = ingest::ingest_file(
        state.store.as_ref(),
        state.embedder.as_ref(),
        file,
        state.config.embedding.batch_size,
    )
    .await
    .with_context(|| format!("Failed to ingest {}", file.display()))?;

    println!(
        "Ingested {} stories and {} Q&A pairs from {}",
        report.stories,
        report.q_and_a,
        file.display()
    );
    Ok(())
}

pub async fn run_stats(state: &AppState) -> anyhow::Result<()> {
    let stats = state.store.stats().await.context("Failed to read store stats")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "path": state.config.database.resolve_path(&state.paths).display().to_string(),
            "stories": stats.stories,
            "q_and_a": stats.q_and_a,
            "embedding_dimensions": stats.embedding_dimensions,
        }))?
    );
    Ok(())
}
