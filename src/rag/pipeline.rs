//! One chat turn: embed, retrieve three ways, assemble, ask the model.

use std::sync::Arc;

use serde::Serialize;

use super::context_builder::{ContextAssembler, ContextConfig};
use super::models::{QandAPair, RetrievedDocument, StoryId};
use super::prompt::render_prompt;
use super::splitter::char_len;
use super::store::VectorStore;
use crate::core::config::{AppConfig, RetrievalConfig};
use crate::core::errors::RagError;
use crate::embedding::EmbeddingProvider;
use crate::llm::ConversationAgent;
use crate::session::ChatSession;

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub fragments: Vec<String>,
    pub examples: Vec<QandAPair>,
    pub best_story_id: StoryId,
}

/// Everything retrieved for a query, before the model is involved.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub documents: Vec<RetrievedDocument>,
    pub best_story: RetrievedDocument,
    pub examples: Vec<QandAPair>,
    pub fragments: Vec<String>,
}

pub struct ChatPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    agent: ConversationAgent,
    assembler: ContextAssembler,
    retrieval: RetrievalConfig,
    max_query_chars: usize,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        agent: ConversationAgent,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            agent,
            assembler: ContextAssembler::new(ContextConfig::from(&config.retrieval)),
            retrieval: config.retrieval.clone(),
            max_query_chars: config.chat.max_query_chars,
        }
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, RagError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(RagError::validation("query must not be empty"));
        }
        let len = char_len(trimmed);
        if len > self.max_query_chars {
            return Err(RagError::Validation(format!(
                "query is {} characters, limit is {}",
                len, self.max_query_chars
            )));
        }
        Ok(trimmed)
    }

    /// Embeds the query once and runs the three store round-trips in order.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext, RagError> {
        let query = self.validate_query(query)?;
        let embedding = self.embedder.embed_query(query).await?;

        let documents = self
            .store
            .search_by_q_and_a(&embedding, self.retrieval.q_and_a_top_k)
            .await?;

        let best_story = self
            .store
            .search_by_story(&embedding, self.retrieval.story_top_k)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::NotFound("no stories in the vector store".to_string()))?;

        let story_ids: Vec<StoryId> = documents.iter().map(|doc| doc.story_id).collect();
        let examples = self
            .store
            .search_q_and_a_docs_by_story(&story_ids, self.retrieval.example_top_k)
            .await?;

        let fragments = self.assembler.assemble(&documents, &best_story);

        tracing::debug!(
            documents = documents.len(),
            best_story_id = best_story.story_id,
            best_story_score = best_story.score,
            examples = examples.len(),
            fragments = fragments.len(),
            "Retrieved context"
        );

        Ok(RetrievedContext {
            documents,
            best_story,
            examples,
            fragments,
        })
    }

    /// Runs a full turn and records it in `session` once the model replies.
    pub async fn handle_turn(
        &self,
        session: &mut ChatSession,
        query: &str,
    ) -> Result<TurnOutcome, RagError> {
        let context = self.retrieve(query).await?;
        let query = query.trim();
        let prompt = render_prompt(query, &context.examples, &context.fragments);

        let reply = self.agent.respond(session, &prompt).await?;

        session.push_user(query);
        session.push_assistant(reply.clone());
        tracing::info!(
            session_id = %session.id(),
            turn = session.turn_count() / 2,
            best_story_id = context.best_story.story_id,
            "Answered turn"
        );

        Ok(TurnOutcome {
            reply,
            fragments: context.fragments,
            examples: context.examples,
            best_story_id: context.best_story.story_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ChatConfig, LlmConfig};
    use crate::llm::{ChatRequest, LlmProvider};
    use crate::rag::models::{NewQandA, NewStory};
    use crate::rag::sqlite::SqliteVectorStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Maps fixed keywords onto axes so similarity is predictable.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(inputs
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    ["france", "gold", "planet"]
                        .iter()
                        .map(|kw| if text.contains(kw) { 1.0 } else { 0.05 })
                        .collect()
                })
                .collect())
        }
    }

    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn health_check(&self) -> Result<bool, RagError> {
            Ok(true)
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(last);
            Ok("grounded answer".to_string())
        }
    }

    async fn pipeline(dir: &tempfile::TempDir, seed: bool) -> (ChatPipeline, Arc<EchoProvider>) {
        let store = SqliteVectorStore::with_path(dir.path().join("pipeline.db"), 1)
            .await
            .unwrap();
        if seed {
            let embed = |s: &str| {
                let s = s.to_lowercase();
                ["france", "gold", "planet"]
                    .iter()
                    .map(|kw| if s.contains(kw) { 1.0 } else { 0.05 })
                    .collect::<Vec<f32>>()
            };
            let story = |text: &str, question: &str, answer: &str| NewStory {
                story: text.to_string(),
                embedding: embed(text),
                q_and_a: vec![NewQandA {
                    question: question.to_string(),
                    answer: answer.to_string(),
                    question_embedding: embed(question),
                }],
            };
            store
                .insert_batch(&[
                    story("Gold is a chemical element.", "What is the symbol for gold?", "Au"),
                    story("Paris is the capital of France.", "Capital of France?", "Paris"),
                    story("Jupiter is the largest planet.", "Largest planet?", "Jupiter"),
                ])
                .await
                .unwrap();
        }

        let provider = Arc::new(EchoProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let mut config = AppConfig::default();
        config.retrieval.q_and_a_top_k = 1;
        let agent = ConversationAgent::new(
            provider.clone(),
            &LlmConfig::default(),
            &ChatConfig::default(),
        );
        let pipeline =
            ChatPipeline::new(Arc::new(store), Arc::new(KeywordEmbedder), agent, &config);
        (pipeline, provider)
    }

    #[tokio::test]
    async fn turn_grounds_prompt_in_best_matches() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, provider) = pipeline(&dir, true).await;
        let mut session = ChatSession::new();

        let outcome = pipeline
            .handle_turn(&mut session, "What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(outcome.reply, "grounded answer");
        assert_eq!(outcome.fragments.first().unwrap(), "Paris is the capital of France.");
        assert_eq!(outcome.fragments.last().unwrap(), "Paris is the capital of France.");
        assert_eq!(outcome.examples[0].answer, "Paris");

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Prompt: What is the capital of France?"));
        assert_eq!(session.turn_count(), 2);
    }

    #[tokio::test]
    async fn empty_store_is_not_found_and_session_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(&dir, false).await;
        let mut session = ChatSession::new();

        let err = pipeline
            .handle_turn(&mut session, "What is the capital of France?")
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::NotFound(_)));
        assert_eq!(session.turn_count(), 0);
    }

    #[tokio::test]
    async fn blank_and_oversized_queries_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(&dir, true).await;

        let err = pipeline.retrieve("   ").await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let err = pipeline.retrieve(&"x".repeat(4_001)).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }
}
