use std::sync::Arc;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::{ChatConfig, LlmConfig};
use crate::core::errors::RagError;
use crate::session::ChatSession;

/// Sends a rendered prompt to the model along with recent session turns.
pub struct ConversationAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    max_tokens: Option<i32>,
    history_window: usize,
}

impl ConversationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, llm: &LlmConfig, chat: &ChatConfig) -> Self {
        Self {
            provider,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            history_window: chat.history_window,
        }
    }

    pub fn build_request(&self, session: &ChatSession, rendered_prompt: &str) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = session.recent(self.history_window).to_vec();
        messages.push(ChatMessage::user(rendered_prompt));

        ChatRequest::new(messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    pub async fn respond(
        &self,
        session: &ChatSession,
        rendered_prompt: &str,
    ) -> Result<String, RagError> {
        let request = self.build_request(session, rendered_prompt);
        let reply = self.provider.chat(request, &self.model).await?;
        if reply.trim().is_empty() {
            return Err(RagError::Llm(format!(
                "{} returned an empty reply",
                self.provider.name()
            )));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingProvider {
        reply: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn health_check(&self) -> Result<bool, RagError> {
            Ok(true)
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn agent(reply: &str, history_window: usize) -> (ConversationAgent, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let agent = ConversationAgent::new(
            provider.clone(),
            &LlmConfig::default(),
            &ChatConfig {
                history_window,
                ..Default::default()
            },
        );
        (agent, provider)
    }

    #[tokio::test]
    async fn prompt_follows_windowed_history() {
        let (agent, provider) = agent("Paris.", 2);
        let mut session = ChatSession::new();
        session.push_user("first question");
        session.push_assistant("first answer");
        session.push_user("second question");
        session.push_assistant("second answer");

        let reply = agent.respond(&session, "rendered prompt").await.unwrap();

        assert_eq!(reply, "Paris.");
        let seen = provider.seen.lock().unwrap();
        let contents: Vec<&str> = seen[0].messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["second question", "second answer", "rendered prompt"]);
        assert_eq!(seen[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let (agent, _) = agent("   ", 4);
        let err = agent.respond(&ChatSession::new(), "p").await.unwrap_err();
        assert!(matches!(err, RagError::Llm(_)));
    }
}
