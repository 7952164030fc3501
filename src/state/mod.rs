use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::embedding::{EmbeddingProvider, OpenAiCompatEmbedder};
use crate::llm::{ConversationAgent, LlmProvider, OpenAiCompatProvider};
use crate::rag::{ChatPipeline, SqliteVectorStore, VectorStore};

pub mod error;

pub use error::InitializationError;

/// Everything a command needs, built once at startup.
///
/// Contains:
/// - Paths and the loaded, validated configuration
/// - The vector store (SQLite)
/// - The embedding and chat-completion clients
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Loads configuration, then opens the store and builds the HTTP clients.
    ///
    /// `config_path` overrides `COQA_RAG_CONFIG_PATH` and the default `config.yml`.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config_path: Option<PathBuf>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone()).with_config_path(config_path);
        let config = config_service
            .load_app_config()
            .map_err(InitializationError::Config)?;

        let store = SqliteVectorStore::from_config(&config.database, paths.as_ref())
            .await
            .map_err(InitializationError::Store)?;

        let embedder = OpenAiCompatEmbedder::new(&config.embedding)
            .map_err(InitializationError::Embedding)?;
        let llm = OpenAiCompatProvider::new(&config.llm).map_err(InitializationError::Llm)?;

        Ok(Arc::new(AppState {
            paths,
            config,
            store: Arc::new(store),
            embedder: Arc::new(embedder),
            llm: Arc::new(llm),
        }))
    }

    pub fn pipeline(&self) -> ChatPipeline {
        let agent = ConversationAgent::new(self.llm.clone(), &self.config.llm, &self.config.chat);
        ChatPipeline::new(
            self.store.clone(),
            self.embedder.clone(),
            agent,
            &self.config,
        )
    }
}
