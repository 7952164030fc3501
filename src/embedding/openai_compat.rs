use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::EmbeddingProvider;
use crate::core::config::EmbeddingConfig;
use crate::core::errors::RagError;

/// Embeddings from any server speaking the OpenAI `/v1/embeddings` API.
#[derive(Clone)]
pub struct OpenAiCompatEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            client,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

fn parse_embeddings(payload: EmbeddingsResponse, expected: usize) -> Result<Vec<Vec<f32>>, RagError> {
    if payload.data.len() != expected {
        return Err(RagError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            payload.data.len()
        )));
    }

    let mut items = payload.data;
    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index);
    }

    let vectors: Vec<Vec<f32>> = items.into_iter().map(|item| item.embedding).collect();
    if vectors.iter().any(|v| v.is_empty()) {
        return Err(RagError::Embedding("received an empty embedding".to_string()));
    }
    if let Some(first) = vectors.first() {
        let dims = first.len();
        if vectors.iter().any(|v| v.len() != dims) {
            return Err(RagError::Embedding(
                "received embeddings of differing dimensions".to_string(),
            ));
        }
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatEmbedder {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("request to {} failed: {}", url, e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("{}: {}", status, text)));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("malformed response: {}", e)))?;

        let vectors = parse_embeddings(payload, inputs.len())?;
        tracing::debug!(inputs = inputs.len(), model = %self.model, "Embedded batch");
        Ok(vectors)
    }
}
