mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use coqa_rag::core::config::AppPaths;
use coqa_rag::core::logging;
use coqa_rag::state::AppState;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths, args.config)
        .await
        .context("Failed to initialize")?;

    match args.command.unwrap_or(Command::Chat) {
        Command::Chat => cli::run_chat(&state).await,
        Command::Ingest { file, clear } => cli::run_ingest(&state, &file, clear).await,
        Command::Stats => cli::run_stats(&state).await,
    }
}
