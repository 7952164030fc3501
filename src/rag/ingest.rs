//! Loads question/answer/context triples into the store.
//!
//! Entries sharing the same context become one story; every entry becomes a
//! Q&A pair of that story.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::{NewQandA, NewStory};
use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::embedding::EmbeddingProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub question: String,
    pub answer: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub stories: usize,
    pub q_and_a: usize,
}

struct StoryGroup<'a> {
    context: &'a str,
    entries: Vec<&'a DatasetEntry>,
}

pub fn load_dataset(path: &Path) -> Result<Vec<DatasetEntry>, RagError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RagError::Validation(format!("cannot read dataset {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        RagError::Validation(format!("dataset {} is not valid: {}", path.display(), e))
    })
}

/// Groups by identical context, keeping first-appearance order.
fn group_by_context(entries: &[DatasetEntry]) -> Vec<StoryGroup<'_>> {
    let mut groups: Vec<StoryGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let context = entry.context.trim();
        match index.get(context) {
            Some(&idx) => groups[idx].entries.push(entry),
            None => {
                index.insert(context, groups.len());
                groups.push(StoryGroup {
                    context,
                    entries: vec![entry],
                });
            }
        }
    }

    groups
}

async fn embed_in_batches(
    embedder: &dyn EmbeddingProvider,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embedder.embed(batch).await?;
        if embedded.len() != batch.len() {
            return Err(RagError::Embedding(format!(
                "{} returned {} vectors for {} inputs",
                embedder.name(),
                embedded.len(),
                batch.len()
            )));
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

pub async fn ingest_entries(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    entries: &[DatasetEntry],
    batch_size: usize,
) -> Result<IngestReport, RagError> {
    if entries.is_empty() {
        return Err(RagError::validation("dataset contains no entries"));
    }
    if let Some(pos) = entries.iter().position(|e| {
        e.question.trim().is_empty() || e.answer.trim().is_empty() || e.context.trim().is_empty()
    }) {
        return Err(RagError::Validation(format!(
            "dataset entry {} has an empty field",
            pos
        )));
    }

    let groups = group_by_context(entries);

    let story_texts: Vec<String> = groups.iter().map(|g| g.context.to_string()).collect();
    let question_texts: Vec<String> = groups
        .iter()
        .flat_map(|g| g.entries.iter().map(|e| e.question.trim().to_string()))
        .collect();

    let story_vectors = embed_in_batches(embedder, story_texts, batch_size).await?;
    let mut question_vectors =
        embed_in_batches(embedder, question_texts, batch_size).await?.into_iter();

    let mut stories = Vec::with_capacity(groups.len());
    for (group, embedding) in groups.iter().zip(story_vectors) {
        let mut q_and_a = Vec::with_capacity(group.entries.len());
        for entry in &group.entries {
            let question_embedding = question_vectors
                .next()
                .ok_or_else(|| RagError::internal("question vectors exhausted"))?;
            q_and_a.push(NewQandA {
                question: entry.question.trim().to_string(),
                answer: entry.answer.trim().to_string(),
                question_embedding,
            });
        }
        stories.push(NewStory {
            story: group.context.to_string(),
            embedding,
            q_and_a,
        });
    }

    store.insert_batch(&stories).await?;

    let report = IngestReport {
        stories: stories.len(),
        q_and_a: entries.len(),
    };
    tracing::info!(
        stories = report.stories,
        q_and_a = report.q_and_a,
        embedder = embedder.name(),
        "Ingested dataset"
    );
    Ok(report)
}

pub async fn ingest_file(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    path: &Path,
    batch_size: usize,
) -> Result<IngestReport, RagError> {
    let entries = load_dataset(path)?;
    ingest_entries(store, embedder, &entries, batch_size).await
}
